pub mod net;
pub mod participant;
pub mod room;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use uuid::Uuid;

    use crate::participant::ConnectionId;
    use crate::room::Room;

    /// Create a room "R1" with `n` members named `Player1..=PlayerN`.
    /// The first member is the admin. Returns the room and member ids in
    /// join order.
    pub fn make_room(n: usize) -> (Room, Vec<ConnectionId>) {
        assert!(n > 0, "a room needs at least one member");
        let ids: Vec<ConnectionId> = (0..n).map(|_| Uuid::new_v4()).collect();
        let mut room = Room::new("R1".to_string(), None, ids[0], "Player1".to_string());
        for (i, id) in ids.iter().enumerate().skip(1) {
            room.admit(*id, format!("Player{}", i + 1));
        }
        (room, ids)
    }
}
