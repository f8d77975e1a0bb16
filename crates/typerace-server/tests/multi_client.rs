#[allow(dead_code)]
mod common;

use typerace_core::net::messages::ServerMessage;
use typerace_core::participant::Role;
use common::{
    TestServer, wait_for_active_rooms, ws_connect, ws_create_room, ws_join_room,
    ws_leave_room, ws_read_server_msg, ws_read_until, ws_send_join, ws_try_read_raw,
    ws_update_progress,
};

#[tokio::test]
async fn three_players_in_room() {
    let server = TestServer::new().await;

    let mut alice = ws_connect(&server.ws_url()).await;
    ws_create_room(&mut alice, "R1", "alice").await;

    let mut bob = ws_connect(&server.ws_url()).await;
    ws_join_room(&mut bob, "R1", "bob").await;
    let _ = ws_read_server_msg(&mut alice).await; // PlayerJoined (2)

    let mut carol = ws_connect(&server.ws_url()).await;
    let joined = ws_join_room(&mut carol, "R1", "carol").await;
    let _ = ws_read_server_msg(&mut alice).await; // PlayerJoined (3)
    let _ = ws_read_server_msg(&mut bob).await; // PlayerJoined (3)

    let names: Vec<&str> = joined
        .room
        .members
        .iter()
        .map(|p| p.display_name.as_str())
        .collect();
    assert_eq!(names, vec!["alice", "bob", "carol"]);
    let admins = joined.room.members.iter().filter(|p| p.is_admin()).count();
    assert_eq!(admins, 1);
}

/// alice creates, bob joins and types, alice disconnects: bob ends up admin
/// of a one-member room.
#[tokio::test]
async fn admin_disconnect_promotes_next_joiner() {
    let server = TestServer::new().await;

    let mut alice = ws_connect(&server.ws_url()).await;
    ws_create_room(&mut alice, "R1", "alice").await;
    let mut bob = ws_connect(&server.ws_url()).await;
    let joined = ws_join_room(&mut bob, "R1", "bob").await;
    let bob_id = joined.room.members[1].connection_id;
    let _ = ws_read_server_msg(&mut alice).await; // PlayerJoined

    ws_update_progress(&mut bob, "R1", "the quick", 80.0, 97.0).await;
    match ws_read_server_msg(&mut alice).await {
        ServerMessage::Leaderboard(board) => {
            assert_eq!(
                (board.members[0].wpm, board.members[0].accuracy),
                (0.0, 100.0)
            );
            assert_eq!(
                (board.members[1].wpm, board.members[1].accuracy),
                (80.0, 97.0)
            );
        },
        other => panic!("Expected Leaderboard, got: {other:?}"),
    }
    let _ = ws_read_server_msg(&mut bob).await; // Leaderboard

    drop(alice);

    match ws_read_server_msg(&mut bob).await {
        ServerMessage::AdminAssigned(a) => assert_eq!(a.room_id, "R1"),
        other => panic!("Expected AdminAssigned, got: {other:?}"),
    }
    match ws_read_server_msg(&mut bob).await {
        ServerMessage::Leaderboard(board) => {
            assert_eq!(board.members.len(), 1);
            assert_eq!(board.members[0].connection_id, bob_id);
            assert_eq!(board.members[0].role, Role::Admin);
        },
        other => panic!("Expected Leaderboard, got: {other:?}"),
    }
    // Exactly one promotion notice.
    assert!(ws_try_read_raw(&mut bob, 200).await.is_none());
}

#[tokio::test]
async fn reconnecting_admin_reclaims_role() {
    let server = TestServer::new().await;

    let mut alice = ws_connect(&server.ws_url()).await;
    let created = ws_create_room(&mut alice, "R1", "alice").await;
    let mut bob = ws_connect(&server.ws_url()).await;
    ws_join_room(&mut bob, "R1", "bob").await;
    let _ = ws_read_server_msg(&mut alice).await; // PlayerJoined

    let mut alice_again = ws_connect(&server.ws_url()).await;
    let joined = ws_join_room(&mut alice_again, "R1", "alice").await;

    assert_eq!(joined.role, Role::Admin);
    assert_eq!(joined.room.admin_id, joined.connection_id);
    let old = joined
        .room
        .members
        .iter()
        .find(|p| p.connection_id == created.connection_id)
        .unwrap();
    assert_eq!(old.role, Role::Player);

    match ws_read_server_msg(&mut alice).await {
        ServerMessage::AdminRevoked(r) => assert_eq!(r.room_id, "R1"),
        other => panic!("Expected AdminRevoked, got: {other:?}"),
    }
    match ws_read_server_msg(&mut alice).await {
        ServerMessage::PlayerJoined(m) => assert_eq!(m.members.len(), 3),
        other => panic!("Expected PlayerJoined, got: {other:?}"),
    }
    // bob is untouched apart from the membership change.
    match ws_read_server_msg(&mut bob).await {
        ServerMessage::PlayerJoined(_) => {},
        other => panic!("Expected PlayerJoined, got: {other:?}"),
    }
    assert!(ws_try_read_raw(&mut bob, 200).await.is_none());
}

#[tokio::test]
async fn room_destroyed_after_all_leave() {
    let server = TestServer::new().await;

    let mut alice = ws_connect(&server.ws_url()).await;
    ws_create_room(&mut alice, "R1", "alice").await;
    let mut bob = ws_connect(&server.ws_url()).await;
    ws_join_room(&mut bob, "R1", "bob").await;

    ws_leave_room(&mut bob, "R1").await;
    drop(alice);

    let health = wait_for_active_rooms(&server, 0).await;
    assert_eq!(health["rooms"]["active"], 0);

    let mut carol = ws_connect(&server.ws_url()).await;
    ws_send_join(&mut carol, "R1", "carol").await;
    match ws_read_server_msg(&mut carol).await {
        ServerMessage::Error(e) => assert_eq!(e.message, "Room R1 not found"),
        other => panic!("Expected Error, got: {other:?}"),
    }
}

#[tokio::test]
async fn recreating_a_room_evicts_members() {
    let server = TestServer::new().await;

    let mut alice = ws_connect(&server.ws_url()).await;
    ws_create_room(&mut alice, "R1", "alice").await;
    let mut bob = ws_connect(&server.ws_url()).await;
    ws_join_room(&mut bob, "R1", "bob").await;
    let _ = ws_read_server_msg(&mut alice).await; // PlayerJoined

    let mut carol = ws_connect(&server.ws_url()).await;
    let created = ws_create_room(&mut carol, "R1", "carol").await;
    assert_eq!(created.room.members.len(), 1);

    for stream in [&mut alice, &mut bob] {
        match ws_read_server_msg(stream).await {
            ServerMessage::Error(e) => assert_eq!(e.message, "Room R1 was recreated"),
            other => panic!("Expected Error, got: {other:?}"),
        }
    }

    // Old members no longer receive the new room's traffic.
    ws_update_progress(&mut carol, "R1", "abc", 10.0, 99.0).await;
    ws_read_until(&mut carol, |m| matches!(m, ServerMessage::Leaderboard(_))).await;
    assert!(ws_try_read_raw(&mut bob, 200).await.is_none());
}

#[tokio::test]
async fn rooms_are_isolated() {
    let server = TestServer::new().await;

    let mut alice = ws_connect(&server.ws_url()).await;
    ws_create_room(&mut alice, "R1", "alice").await;
    let mut dave = ws_connect(&server.ws_url()).await;
    ws_create_room(&mut dave, "R2", "dave").await;

    ws_update_progress(&mut alice, "R1", "abc", 30.0, 95.0).await;
    let _ = ws_read_server_msg(&mut alice).await;

    assert!(ws_try_read_raw(&mut dave, 200).await.is_none());
}
