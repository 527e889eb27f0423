use threes_tdl::action::Action;
use threes_tdl::agent::{Agent, RandomPlacer, TdlAgent};
use threes_tdl::engine::{Board, ILLEGAL};
use threes_tdl::episode::{Episode, INITIAL_PLACEMENTS};
use threes_tdl::network::Network;
use threes_tdl::stats::Statistics;

fn small_network() -> Network { Network::from_tuples(&[[0usize, 1, 2, 3], [4, 5, 6, 7]]).unwrap() }

#[test]
fn it_plays_legal_games() {
    let mut slider = TdlAgent::<Board>::with_network("alpha=0.1", small_network()).unwrap();
    let mut placer = RandomPlacer::new("seed=7").unwrap();
    for _ in 0..5 {
        let ep = Episode::play(&mut slider, &mut placer);
        assert_eq!(slider.trajectory_len(), 0);

        // replay: every recorded action is legal and alternates after the opening
        let mut b = Board::EMPTY;
        for (i, (action, reward)) in ep.actions().iter().enumerate() {
            let sliding = i >= INITIAL_PLACEMENTS && i % 2 == 1;
            assert_eq!(matches!(action, Action::Slide(_)), sliding, "action {i}: {action}");
            assert_eq!(action.apply(&mut b), *reward);
            assert_ne!(*reward, ILLEGAL);
        }
        assert_eq!(&b, ep.state());
    }
}

#[test]
fn it_learns_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let weights = dir.path().join("weights.bin");
    let stats_path = dir.path().join("stats.jsonl");

    {
        let args = format!("alpha=0.1 save={}", weights.display());
        let mut slider = TdlAgent::<Board>::with_network(&args, small_network()).unwrap();
        let mut placer = RandomPlacer::new("seed=3").unwrap();
        let mut stats = Statistics::new(20, 10).with_output(&stats_path).unwrap();
        let mut blocks = 0;
        while !stats.is_finished() {
            let ep = Episode::play(&mut slider, &mut placer);
            blocks += stats.push(ep.outcome()).unwrap().is_some() as usize;
        }
        assert_eq!(blocks, 2);
        assert_ne!(slider.network(), &small_network());
    }

    let reloaded = TdlAgent::<Board>::with_network(&format!("load={}", weights.display()), small_network()).unwrap();
    assert_ne!(reloaded.network(), &small_network());
    assert_eq!(Agent::<Board>::name(&reloaded), "tdl");
    assert_eq!(std::fs::read_to_string(&stats_path).unwrap().lines().count(), 2);
}
