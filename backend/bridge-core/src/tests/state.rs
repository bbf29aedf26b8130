use crate::connection::Phase;
use crate::connection::state::ConnectionState;

/// **VALUE**: Verifies the happy path from dial to authenticated.
///
/// **BUG THIS CATCHES**: Would catch `mark_open` not resetting the attempt counter after
/// a successful reconnect.
#[test]
fn given_dial_when_opened_and_authenticated_then_phases_advance() {
    // GIVEN: A state that went through one reconnect
    let mut state = ConnectionState::new(true);
    state.begin_reconnect();
    assert_eq!(state.reconnect_attempts(), 1);
    assert_eq!(state.phase(), Phase::Reconnecting);

    // WHEN: Dialing, opening, authenticating
    let session = state.begin_dial();
    assert_eq!(state.phase(), Phase::Connecting);
    assert!(state.mark_open(session));
    assert!(state.mark_authenticated());

    // THEN: Authenticated with a fresh attempt budget
    assert_eq!(state.phase(), Phase::Authenticated);
    assert!(state.phase().is_connected());
    assert_eq!(state.reconnect_attempts(), 0);
}

/// **VALUE**: Verifies events for an abandoned socket are recognized as stale.
///
/// **WHY THIS MATTERS**: A socket closed by `disconnect` may still report an open or a
/// close afterwards. Acting on it would emit notifications after disconnect returned.
///
/// **BUG THIS CATCHES**: Would catch session ids being reused or not cleared.
#[test]
fn given_abandoned_session_when_its_events_arrive_then_ignored() {
    let mut state = ConnectionState::new(true);
    let old = state.begin_dial();
    state.mark_disconnected();

    assert!(!state.is_current(old));
    assert!(!state.mark_open(old));

    let new = state.begin_dial();
    assert_ne!(old, new);
    assert!(!state.mark_open(old), "Old socket must not open the new dial");
    assert!(state.mark_open(new));
}

/// **VALUE**: Verifies authentication cannot outlive the socket.
///
/// **BUG THIS CATCHES**: Would catch a late `module:authenticated` flipping a
/// disconnected connector to authenticated.
#[test]
fn given_disconnected_when_marking_authenticated_then_refused() {
    let mut state = ConnectionState::new(true);

    assert!(!state.mark_authenticated());

    let session = state.begin_dial();
    state.mark_open(session);
    state.mark_authenticated();
    state.mark_disconnected();

    assert_eq!(state.phase(), Phase::Disconnected);
    assert!(!state.phase().is_authenticated());
}

/// **VALUE**: Verifies a cancelled reconnect timer cannot fire.
///
/// **BUG THIS CATCHES**: Would catch a timer that was aborted too late still dialing
/// after `disconnect`.
#[test]
fn given_cancelled_reconnect_when_timer_fires_then_not_taken() {
    let mut state = ConnectionState::new(true);
    let timer = state.begin_reconnect();
    state.cancel_reconnect();

    assert!(!state.take_reconnect(timer));
    assert_eq!(state.phase(), Phase::Disconnected);

    let timer = state.begin_reconnect();
    assert!(state.take_reconnect(timer));
    assert!(!state.take_reconnect(timer), "A timer fires at most once");
}

/// **VALUE**: Verifies auth failure keeps the socket phase.
#[test]
fn given_authenticated_when_auth_revoked_then_back_to_connected() {
    let mut state = ConnectionState::new(false);
    let session = state.begin_dial();
    state.mark_open(session);
    state.mark_authenticated();

    state.mark_unauthenticated();

    assert_eq!(state.phase(), Phase::Connected);
    assert!(!state.auto_reconnect());
}
