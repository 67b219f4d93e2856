use stackduel::ml::{DrawSpace, PlaySpace, draw_features, play_features};
use stackduel::{GameError, GameState, create_agent_from_spec, label_for_spec, score_delta};

#[test]
fn registry_agents_complete_a_match() -> Result<(), GameError> {
    let mut agents = vec![
        create_agent_from_spec("min", 0, 0x5EED).expect("min agent"),
        create_agent_from_spec("random:99", 1, 0x5EED).expect("random agent"),
    ];
    let mut game = GameState::builder().with_seed(0xBEEF).build()?;

    let mut sub_turns = 0usize;
    while !game.is_finished() {
        assert!(sub_turns < 5_000, "match failed to terminate");
        let current = game.current_player();

        let (features, mask) = play_features(&game.state_view(), &game.legal_plays());
        let choice = agents[current].pick_play(&features, &mask);
        assert_eq!(mask[choice], 1.0, "agents must respect the play mask");
        let action = PlaySpace::index_to_action(choice).expect("decoded");
        game.play_or_discard(action.card, action.is_discard)?;

        let (features, mask) = draw_features(&game.state_view(), &game.legal_draws());
        let choice = agents[current].pick_draw(&features, &mask);
        assert_eq!(mask[choice], 1.0, "agents must respect the draw mask");
        let draw = DrawSpace::index_to_choice(choice).expect("decoded");
        game.draw_replacement(draw)?;

        sub_turns += 1;
        if game.is_finished() {
            break;
        }
        game.end_sub_turn()?;
    }

    // A finished match always produces a defined score delta.
    let _ = score_delta(&game.state_view());
    Ok(())
}

#[test]
fn min_agent_prefers_a_free_play_over_a_discard() {
    // Hand a state to the min agent where one card extends a stack with no
    // value gap; the cheapest option must be that play, not a discard.
    let mut game = GameState::builder().with_seed(0x1234).build().expect("game");
    let mut agent = create_agent_from_spec("min", 0, 0).expect("min agent");

    // Drive the match; whenever a gap-free extension is on offer the agent
    // must choose some play rather than surrender a card to the piles.
    for _ in 0..30 {
        if game.is_finished() {
            break;
        }
        let legal = game.legal_plays();
        let view = game.state_view();
        let zero_gap_exists = legal.iter().any(|action| {
            if action.is_discard {
                return false;
            }
            let stack = &view.own_stacks[action.card.colour().index()];
            stack
                .last()
                .is_some_and(|top| top.value() == action.card.value())
        });
        let (features, mask) = play_features(&view, &legal);
        let choice = agent.pick_play(&features, &mask);
        let action = PlaySpace::index_to_action(choice).expect("decoded");
        if zero_gap_exists {
            assert!(
                !action.is_discard,
                "a zero-gap extension is always cheaper than any discard"
            );
        }
        game.play_or_discard(action.card, action.is_discard).expect("legal");

        let (features, mask) = draw_features(&game.state_view(), &game.legal_draws());
        let choice = agent.pick_draw(&features, &mask);
        let draw = DrawSpace::index_to_choice(choice).expect("decoded");
        game.draw_replacement(draw).expect("legal");
        if game.is_finished() {
            break;
        }
        game.end_sub_turn().expect("swap");
    }
}

#[test]
fn labels_normalise_specs() {
    assert_eq!(label_for_spec("Random:7"), "random");
    assert_eq!(label_for_spec("min:nowild"), "min");
}
