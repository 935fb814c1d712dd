use crate::{
    api::{
        collections, Direction, FieldUpdate, GroupId, GroupMessage, ListenTarget, MessageId, Query,
        StudyGroup,
    },
    Backend,
};

#[derive(Clone)]
pub struct StudyGroupRepository(Backend);

impl StudyGroupRepository {
    pub fn new(backend: Backend) -> StudyGroupRepository {
        StudyGroupRepository(backend)
    }

    pub async fn add_group(&self, group: &StudyGroup) -> anyhow::Result<GroupId> {
        let id = GroupId::from(self.0.add(&collections::study_groups(), group).await?);
        tracing::info!(group=%id, name=%group.group_name, "created study group");
        Ok(id)
    }

    pub async fn update_group(&self, group: &StudyGroup) -> anyhow::Result<()> {
        anyhow::ensure!(!group.id.is_empty(), "updating a study group that was never created");
        self.0
            .set(&collections::study_groups().doc(&group.id), group)
            .await
    }

    pub async fn add_message(&self, message: &GroupMessage) -> anyhow::Result<MessageId> {
        let id = self
            .0
            .add(&collections::group_messages(&message.group_id), message)
            .await?;
        Ok(MessageId::from(id))
    }

    pub async fn group_by_id(&self, group: &GroupId) -> anyhow::Result<Option<StudyGroup>> {
        self.0.get(&collections::study_groups().doc(group)).await
    }

    pub fn group_target(group: &GroupId) -> ListenTarget {
        ListenTarget::Document(collections::study_groups().doc(group))
    }

    pub fn group_targets(groups: &[GroupId]) -> Vec<ListenTarget> {
        groups.iter().map(Self::group_target).collect()
    }

    pub async fn increment_members_count(&self, group: &GroupId, by: i64) -> anyhow::Result<()> {
        self.0
            .update(
                &collections::study_groups().doc(group),
                vec![FieldUpdate::increment("members_count", by)],
            )
            .await
    }

    pub async fn update_online_image_uri(&self, group: &GroupId, uri: &str) -> anyhow::Result<()> {
        self.0
            .update(
                &collections::study_groups().doc(group),
                vec![FieldUpdate::set("online_image_uri", uri)],
            )
            .await
    }

    pub fn messages_query(group: &GroupId) -> Query {
        Query::all(collections::group_messages(group)).order_by("created_at", Direction::Asc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::test_util;

    #[tokio::test]
    async fn messages_come_back_in_time_order() {
        let (_srv, backend) = test_util::backend();
        let repo = StudyGroupRepository::new(backend.clone());
        let group = repo.add_group(&StudyGroup::default()).await.unwrap();
        let t0 = crate::api::now();
        for (i, text) in ["second", "first"].into_iter().enumerate() {
            let msg = GroupMessage {
                group_id: group.clone(),
                text: String::from(text),
                created_at: t0 - chrono::Duration::seconds(i as i64),
                ..GroupMessage::default()
            };
            repo.add_message(&msg).await.unwrap();
        }
        let msgs = backend
            .query::<GroupMessage>(&StudyGroupRepository::messages_query(&group))
            .await
            .unwrap();
        let texts = msgs.iter().map(|m| m.text.as_str()).collect::<Vec<_>>();
        assert_eq!(texts, vec!["first", "second"]);
    }
}
