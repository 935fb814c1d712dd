//! Where each kind of document lives

use crate::{CollectionPath, CourseId, GroupId, UserId};

pub fn courses() -> CollectionPath {
    CollectionPath::root("courses")
}

pub fn course_comments(course: &CourseId) -> CollectionPath {
    CollectionPath::root("course-comments").child(&course.0, "comments")
}

pub fn course_likes() -> CollectionPath {
    CollectionPath::root("courses-likes")
}

pub fn course_categories() -> CollectionPath {
    CollectionPath::root("course-category")
}

pub fn lessons() -> CollectionPath {
    CollectionPath::root("lessons")
}

pub fn channels() -> CollectionPath {
    CollectionPath::root("channels")
}

pub fn study_groups() -> CollectionPath {
    CollectionPath::root("study-groups")
}

pub fn group_messages(group: &GroupId) -> CollectionPath {
    CollectionPath::root("group-messages").child(&group.0, "messages")
}

pub fn users() -> CollectionPath {
    CollectionPath::root("users")
}

pub fn feedback() -> CollectionPath {
    CollectionPath::root("users-messages")
}

fn user_sub(user: &UserId, name: &str) -> CollectionPath {
    users().child(&user.0, name)
}

pub fn friends(user: &UserId) -> CollectionPath {
    user_sub(user, "friends")
}

pub fn course_studies(user: &UserId) -> CollectionPath {
    user_sub(user, "course-study")
}

pub fn group_memberships(user: &UserId) -> CollectionPath {
    user_sub(user, "group-member")
}

pub fn channel_memberships(user: &UserId) -> CollectionPath {
    user_sub(user, "channel-member")
}

pub fn learning_list(user: &UserId) -> CollectionPath {
    user_sub(user, "learning-list")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_paths() {
        let u = UserId::from("u1");
        assert_eq!(friends(&u).as_str(), "users/u1/friends");
        assert_eq!(group_memberships(&u).as_str(), "users/u1/group-member");
        assert_eq!(
            group_messages(&GroupId::from("g1")).as_str(),
            "group-messages/g1/messages"
        );
    }
}
