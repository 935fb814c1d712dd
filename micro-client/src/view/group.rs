use std::cmp::Reverse;

use anyhow::anyhow;

use crate::{
    api::{
        now, GroupId, GroupMessage, Lesson, MemberOfStudyGroup, MessageId, MessageKind, Snapshot,
        StudyGroup, UserId,
    },
    composite::{self, Composite},
    reconcile,
    repo::{StudyGroupRepository, UserRepository},
    subscription::Subscriptions,
    view::UiState,
    Backend,
};

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum GroupSlot {
    MemberIds,
    Group(GroupId),
    Open,
    Messages,
}

pub struct StudyGroupViewModel {
    backend: Backend,
    groups: StudyGroupRepository,
    users: UserRepository,
    subs: Subscriptions<GroupSlot>,
    uid: UserId,
    member_groups: Composite<GroupId>,

    pub user_groups: Vec<StudyGroup>,
    pub open_group: Option<StudyGroup>,

    /// Messages of the open group, oldest first
    pub messages: Vec<GroupMessage>,
    pub ui_state: UiState,
}

impl StudyGroupViewModel {
    pub async fn new(backend: Backend) -> anyhow::Result<StudyGroupViewModel> {
        let uid = backend.current_uid()?;
        let mut subs = Subscriptions::new(backend.store.clone());
        subs.subscribe(GroupSlot::MemberIds, UserRepository::group_ids_query(&uid))
            .await?;
        Ok(StudyGroupViewModel {
            groups: StudyGroupRepository::new(backend.clone()),
            users: UserRepository::new(backend.clone()),
            backend,
            subs,
            uid,
            member_groups: Composite::new(),
            user_groups: Vec::new(),
            open_group: None,
            messages: Vec::new(),
            ui_state: UiState::Empty,
        })
    }

    pub async fn apply_pending(&mut self) -> usize {
        let mut num = 0;
        while let Some((slot, snap)) = self.subs.try_next() {
            self.handle(slot, snap).await;
            num += 1;
        }
        num
    }

    pub async fn next_update(&mut self) -> Option<GroupSlot> {
        let (slot, snap) = self.subs.next().await?;
        self.handle(slot.clone(), snap).await;
        Some(slot)
    }

    async fn handle(&mut self, slot: GroupSlot, snap: Snapshot) {
        let res = match &slot {
            GroupSlot::MemberIds => self.on_member_ids(&snap).await,
            GroupSlot::Group(_) => composite::fold(&mut self.user_groups, &snap),
            GroupSlot::Open => match snap.decode_one::<StudyGroup>() {
                Ok(Some(group)) => {
                    self.open_group = Some(group);
                    Ok(())
                }
                Ok(None) => Ok(()),
                Err(e) => Err(e.into()),
            },
            GroupSlot::Messages => self.on_messages(&snap),
        };
        if let Err(error) = res {
            tracing::warn!(?slot, "ignoring snapshot: {error:#}");
        }
    }

    async fn on_member_ids(&mut self, snap: &Snapshot) -> anyhow::Result<()> {
        let ids = snap
            .decode_all::<MemberOfStudyGroup>()?
            .into_iter()
            .map(|m| m.group_id)
            .collect::<Vec<_>>();
        self.member_groups
            .assemble(
                &mut self.subs,
                &mut self.user_groups,
                ids,
                |id| GroupSlot::Group(id.clone()),
                StudyGroupRepository::group_target,
            )
            .await
    }

    fn on_messages(&mut self, snap: &Snapshot) -> anyhow::Result<()> {
        let mut messages = snap.decode_all::<GroupMessage>()?;
        for m in messages.iter_mut() {
            m.is_mine = m.author_id == self.uid;
        }
        reconcile::replace_all(&mut self.messages, messages);
        Ok(())
    }

    /// Copy of the user's groups, most recently active first
    pub fn groups_by_recent_activity(&self) -> Vec<StudyGroup> {
        let mut res = self.user_groups.clone();
        res.sort_by_key(|g| Reverse(g.last_activity()));
        res
    }

    pub async fn open_group(&mut self, group: &GroupId) -> anyhow::Result<()> {
        self.close_group();
        self.ui_state = UiState::Loading;
        let res = async {
            self.subs
                .subscribe(GroupSlot::Open, StudyGroupRepository::group_target(group))
                .await?;
            self.subs
                .subscribe(GroupSlot::Messages, StudyGroupRepository::messages_query(group))
                .await
        };
        match res.await {
            Ok(()) => {
                self.ui_state = UiState::Success;
                Ok(())
            }
            Err(e) => {
                self.ui_state = UiState::from_error(&e);
                Err(e)
            }
        }
    }

    pub fn close_group(&mut self) {
        self.subs.unsubscribe(&GroupSlot::Open);
        self.subs.unsubscribe(&GroupSlot::Messages);
        self.open_group = None;
        self.messages.clear();
    }

    pub async fn send_message(&mut self, text: &str) -> anyhow::Result<MessageId> {
        let msg = GroupMessage {
            text: String::from(text),
            kind: MessageKind::Text,
            ..GroupMessage::default()
        };
        self.post(msg).await
    }

    pub async fn share_lesson(&mut self, lesson: &Lesson) -> anyhow::Result<MessageId> {
        let msg = GroupMessage {
            text: lesson.title.clone(),
            kind: MessageKind::Lesson,
            lesson_id: lesson.id.clone(),
            lesson_title: lesson.title.clone(),
            ..GroupMessage::default()
        };
        self.post(msg).await
    }

    /// Adds the message, then overwrites the group with it as last message
    async fn post(&mut self, mut msg: GroupMessage) -> anyhow::Result<MessageId> {
        let author = self.backend.signed_in()?;
        let mut group = self
            .open_group
            .clone()
            .ok_or_else(|| anyhow!("no study group is open"))?;
        msg.group_id = group.id.clone();
        msg.author_id = author.uid;
        msg.author_name = author.display_name;
        msg.created_at = now();
        let id = self.groups.add_message(&msg).await?;
        msg.id = id.clone();
        group.updated_at = msg.created_at;
        group.last_message = Some(msg);
        self.groups.update_group(&group).await?;
        Ok(id)
    }

    /// Removes the membership; the group list follows through its listener
    pub async fn leave_group(&mut self, group: &GroupId) -> anyhow::Result<()> {
        self.users.leave_group(&self.uid, group).await?;
        if self.open_group.as_ref().map(|g| &g.id) == Some(group) {
            self.close_group();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{LessonId, User},
        repo::test_util,
    };

    async fn setup() -> (Backend, UserId, Vec<GroupId>) {
        let (_srv, backend, uid) = test_util::signed_in("ada@example.org").await;
        let users = UserRepository::new(backend.clone());
        users
            .add_user(&User {
                uid: uid.clone(),
                email: String::from("ada@example.org"),
                ..User::default()
            })
            .await
            .unwrap();
        let repo = StudyGroupRepository::new(backend.clone());
        let mut groups = Vec::new();
        for name in ["first", "second"] {
            let id = repo
                .add_group(&StudyGroup {
                    group_name: String::from(name),
                    created_at: now() - chrono::Duration::minutes(1),
                    ..StudyGroup::default()
                })
                .await
                .unwrap();
            assert!(users
                .add_group_member_by_email("ada@example.org", &id)
                .await
                .unwrap());
            groups.push(id);
        }
        (backend, uid, groups)
    }

    #[tokio::test]
    async fn chat_updates_last_message() {
        let (backend, _uid, groups) = setup().await;
        let mut vm = StudyGroupViewModel::new(backend).await.unwrap();
        vm.apply_pending().await;
        assert_eq!(vm.user_groups.len(), 2);

        vm.open_group(&groups[0]).await.unwrap();
        vm.apply_pending().await;
        vm.send_message("hello").await.unwrap();
        vm.share_lesson(&Lesson {
            id: LessonId::from("l1"),
            title: String::from("Traits"),
            ..Lesson::default()
        })
        .await
        .unwrap();
        vm.apply_pending().await;

        assert_eq!(vm.messages.len(), 2);
        assert!(vm.messages.iter().all(|m| m.is_mine));
        assert_eq!(vm.messages[1].kind, MessageKind::Lesson);
        let last = vm
            .open_group
            .as_ref()
            .and_then(|g| g.last_message.clone())
            .unwrap();
        assert_eq!(last.lesson_title, "Traits");

        // list order is untouched, the sorted copy puts the active group first
        let by_activity = vm.groups_by_recent_activity();
        assert_eq!(by_activity[0].id, groups[0]);
        assert_eq!(vm.user_groups.len(), 2);
    }

    #[tokio::test]
    async fn leaving_closes_the_group() {
        let (backend, _uid, groups) = setup().await;
        let mut vm = StudyGroupViewModel::new(backend).await.unwrap();
        vm.apply_pending().await;
        vm.open_group(&groups[1]).await.unwrap();
        vm.apply_pending().await;
        assert_eq!(vm.open_group.as_ref().unwrap().group_name, "second");

        vm.leave_group(&groups[1]).await.unwrap();
        vm.apply_pending().await;
        assert!(vm.open_group.is_none());
        assert_eq!(vm.user_groups.len(), 1);
        assert_eq!(vm.user_groups[0].id, groups[0]);
    }

    #[tokio::test]
    async fn sending_without_open_group_fails() {
        let (backend, _uid, _groups) = setup().await;
        let mut vm = StudyGroupViewModel::new(backend).await.unwrap();
        assert!(vm.send_message("hello?").await.is_err());
    }
}
