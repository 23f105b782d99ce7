//! 房间成员关系追踪
//!
//! 记录每个身份加入了哪些房间，双向索引以便按房间广播。
//! 成员关系不跨连接存活：连接断开时必须整体清除。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use domain::{Identity, RoomId};
use tokio::sync::RwLock;

pub struct RoomMembershipTracker {
    /// 身份到已加入房间集合的映射
    member_rooms: Arc<RwLock<HashMap<Identity, HashSet<RoomId>>>>,
    /// 房间到成员集合的映射
    room_members: Arc<RwLock<HashMap<RoomId, HashSet<Identity>>>>,
}

impl Default for RoomMembershipTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomMembershipTracker {
    pub fn new() -> Self {
        Self {
            member_rooms: Arc::new(RwLock::new(HashMap::new())),
            room_members: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 加入房间，幂等。
    pub async fn join(&self, identity: Identity, room_id: RoomId) {
        let mut member_rooms = self.member_rooms.write().await;
        let mut room_members = self.room_members.write().await;

        member_rooms
            .entry(identity.clone())
            .or_default()
            .insert(room_id.clone());
        room_members.entry(room_id).or_default().insert(identity);
    }

    /// 离开房间；集合为空时移除整个条目，避免空集合无界增长。
    pub async fn leave(&self, identity: &Identity, room_id: &RoomId) {
        let mut member_rooms = self.member_rooms.write().await;
        let mut room_members = self.room_members.write().await;

        if let Some(rooms) = member_rooms.get_mut(identity) {
            rooms.remove(room_id);
            if rooms.is_empty() {
                member_rooms.remove(identity);
            }
        }

        if let Some(members) = room_members.get_mut(room_id) {
            members.remove(identity);
            if members.is_empty() {
                room_members.remove(room_id);
            }
        }
    }

    /// 断开连接时调用：清除该身份的全部房间关联，返回离开的
    /// 房间列表，调用方据此停止向该连接投递房间广播。
    pub async fn clear(&self, identity: &Identity) -> Vec<RoomId> {
        let mut member_rooms = self.member_rooms.write().await;
        let mut room_members = self.room_members.write().await;

        let rooms: Vec<RoomId> = member_rooms
            .remove(identity)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();

        for room_id in &rooms {
            if let Some(members) = room_members.get_mut(room_id) {
                members.remove(identity);
                if members.is_empty() {
                    room_members.remove(room_id);
                }
            }
        }

        rooms
    }

    /// 房间当前全部成员。
    pub async fn members(&self, room_id: &RoomId) -> Vec<Identity> {
        let room_members = self.room_members.read().await;
        room_members
            .get(room_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 身份当前加入的全部房间。
    pub async fn rooms_of(&self, identity: &Identity) -> Vec<RoomId> {
        let member_rooms = self.member_rooms.read().await;
        member_rooms
            .get(identity)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 身份是否为房间成员。
    pub async fn is_member(&self, identity: &Identity, room_id: &RoomId) -> bool {
        let member_rooms = self.member_rooms.read().await;
        member_rooms
            .get(identity)
            .map(|rooms| rooms.contains(room_id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{ConnectionId, UserId};

    fn identity(id: &str) -> Identity {
        Identity::Authenticated(UserId::parse(id).unwrap())
    }

    fn room(id: &str) -> RoomId {
        RoomId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn join_is_idempotent() {
        let tracker = RoomMembershipTracker::new();
        let alice = identity("u1");

        tracker.join(alice.clone(), room("r1")).await;
        tracker.join(alice.clone(), room("r1")).await;

        assert_eq!(tracker.rooms_of(&alice).await, vec![room("r1")]);
        assert_eq!(tracker.members(&room("r1")).await.len(), 1);
    }

    #[tokio::test]
    async fn final_membership_matches_last_operation() {
        let tracker = RoomMembershipTracker::new();
        let alice = identity("u1");

        // 任意 join/leave 序列后，成员关系等于最后一次操作
        tracker.join(alice.clone(), room("r1")).await;
        tracker.leave(&alice, &room("r1")).await;
        tracker.join(alice.clone(), room("r1")).await;
        assert!(tracker.is_member(&alice, &room("r1")).await);

        tracker.leave(&alice, &room("r1")).await;
        assert!(!tracker.is_member(&alice, &room("r1")).await);
        assert!(tracker.rooms_of(&alice).await.is_empty());
    }

    #[tokio::test]
    async fn leave_drops_empty_entries() {
        let tracker = RoomMembershipTracker::new();
        let alice = identity("u1");

        tracker.join(alice.clone(), room("r1")).await;
        tracker.leave(&alice, &room("r1")).await;

        assert!(tracker.members(&room("r1")).await.is_empty());
        assert!(tracker.rooms_of(&alice).await.is_empty());
    }

    #[tokio::test]
    async fn clear_removes_all_rooms_for_identity() {
        let tracker = RoomMembershipTracker::new();
        let alice = identity("u1");
        let bob = identity("u2");

        tracker.join(alice.clone(), room("r1")).await;
        tracker.join(alice.clone(), room("r2")).await;
        tracker.join(bob.clone(), room("r1")).await;

        let mut left = tracker.clear(&alice).await;
        left.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(left, vec![room("r1"), room("r2")]);

        // 其他成员不受影响
        assert_eq!(tracker.members(&room("r1")).await, vec![bob.clone()]);
        assert!(tracker.rooms_of(&alice).await.is_empty());

        // 重复清除是 no-op
        assert!(tracker.clear(&alice).await.is_empty());
    }

    #[tokio::test]
    async fn anonymous_identities_track_membership_too() {
        let tracker = RoomMembershipTracker::new();
        let anon = Identity::Anonymous(ConnectionId::generate());

        tracker.join(anon.clone(), room("r1")).await;
        assert!(tracker.is_member(&anon, &room("r1")).await);
    }
}
