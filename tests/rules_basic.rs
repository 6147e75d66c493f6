use flipstone::board::{Board, Color, Score};
use flipstone::game::{apply_move, GameState, Status};
use pretty_assertions::assert_eq;

fn playing(board: Board, turn: Color) -> GameState {
    let mut state = GameState::new();
    state.board = board;
    state.turn = turn;
    state.status = Status::Playing;
    state
}

#[test]
fn black_opening_move_flips_the_center_disc() {
    let state = playing(Board::standard_start(), Color::Black);
    let next = apply_move(&state, Color::Black, 2, 3).unwrap();

    assert_eq!(next.board.get(2, 3), Some(Color::Black));
    assert_eq!(next.board.get(3, 3), Some(Color::Black));
    assert_eq!(next.board.score(), Score { black: 4, white: 1 });
    assert_eq!(next.turn, Color::White);
    assert_eq!(next.status, Status::Playing);
}

#[test]
fn illegal_cell_is_rejected_without_change() {
    let state = playing(Board::standard_start(), Color::Black);
    let before = state.clone();

    assert!(apply_move(&state, Color::Black, 0, 0).is_err());
    assert!(apply_move(&state, Color::Black, 3, 3).is_err());
    assert_eq!(state, before);
}

#[test]
fn full_playout_preserves_invariants() {
    // Greedy playout: always take the first valid move. Checks conservation,
    // the occupancy-plus-one property and the pass rule on every step.
    let mut state = playing(Board::standard_start(), Color::Black);
    let mut steps = 0;

    while state.status == Status::Playing {
        let mover = state.turn;
        let moves = state.board.valid_moves(mover);
        assert!(!moves.is_empty(), "player on turn must have a move while playing");

        let occupied_before = 64 - state.board.empty_count();
        let square = moves[0];
        let next = apply_move(&state, mover, square.row, square.col).unwrap();

        let score = next.board.score();
        assert_eq!(score.black + score.white + next.board.empty_count(), 64);
        assert_eq!(64 - next.board.empty_count(), occupied_before + 1);

        if next.status == Status::Playing && next.turn == mover {
            // Forced pass: only allowed when the opponent was left stuck.
            assert!(next.board.valid_moves(mover.opponent()).is_empty());
        }

        state = next;
        steps += 1;
        assert!(steps <= 60, "a game cannot outlast the empty cells");
    }

    assert_eq!(state.status, Status::Ended);
    assert!(state.winner.is_some());
}
