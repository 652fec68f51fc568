use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;

use server::entity::{comment, reply};

use crate::common::{TestApp, routes};

mod commenting {
    use super::*;

    #[tokio::test]
    async fn user_can_comment_on_a_story() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let story_id = app.create_story(&alice, "Commentable").await;

        let res = app
            .post_with_token(
                &routes::story_comments(story_id),
                &json!({"text": "Loved it!"}),
                &bob,
            )
            .await;

        assert_eq!(res.status, 201, "Comment failed: {}", res.text);
        assert_eq!(res.body["text"], "Loved it!");
        assert_eq!(res.body["user"]["username"], "bob");
    }

    #[tokio::test]
    async fn empty_comment_creates_no_row() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let story_id = app.create_story(&alice, "Commentable").await;

        let res = app
            .post_with_token(
                &routes::story_comments(story_id),
                &json!({"text": "   \n  "}),
                &alice,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        let rows = comment::Entity::find().count(&app.db).await.unwrap();
        assert_eq!(rows, 0, "Blank comment must not be persisted");
    }

    #[tokio::test]
    async fn comment_text_is_trimmed() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let story_id = app.create_story(&alice, "Commentable").await;

        let res = app
            .post_with_token(
                &routes::story_comments(story_id),
                &json!({"text": "  nice  "}),
                &alice,
            )
            .await;

        assert_eq!(res.status, 201);
        assert_eq!(res.body["text"], "nice");
    }

    #[tokio::test]
    async fn story_detail_lists_comments_newest_first() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let story_id = app.create_story(&alice, "Commentable").await;
        app.create_comment(story_id, &alice, "first").await;
        app.create_comment(story_id, &alice, "second").await;

        let res = app.get_without_token(&routes::story(story_id)).await;

        let comments = res.body["comments"].as_array().unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0]["text"], "second");
        assert_eq!(comments[1]["text"], "first");
    }
}

mod comment_ownership {
    use super::*;

    #[tokio::test]
    async fn author_can_edit_their_comment() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let story_id = app.create_story(&alice, "Commentable").await;
        let comment_id = app.create_comment(story_id, &alice, "typo herre").await;

        let res = app
            .patch_with_token(
                &routes::comment(comment_id),
                &json!({"text": "typo here"}),
                &alice,
            )
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["text"], "typo here");
    }

    #[tokio::test]
    async fn non_author_cannot_edit_a_comment() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let story_id = app.create_story(&alice, "Commentable").await;
        let comment_id = app.create_comment(story_id, &alice, "mine").await;

        let res = app
            .patch_with_token(
                &routes::comment(comment_id),
                &json!({"text": "hijacked"}),
                &bob,
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn non_author_cannot_delete_a_comment() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let story_id = app.create_story(&alice, "Commentable").await;
        let comment_id = app.create_comment(story_id, &alice, "mine").await;

        let res = app.delete_with_token(&routes::comment(comment_id), &bob).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn deleting_a_comment_removes_its_replies() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let story_id = app.create_story(&alice, "Commentable").await;
        let comment_id = app.create_comment(story_id, &alice, "mine").await;

        let res = app
            .post_with_token(
                &routes::comment_replies(comment_id),
                &json!({"text": "a reply"}),
                &bob,
            )
            .await;
        assert_eq!(res.status, 201, "Reply failed: {}", res.text);

        let res = app
            .delete_with_token(&routes::comment(comment_id), &alice)
            .await;
        assert_eq!(res.status, 204);

        let rows = reply::Entity::find().count(&app.db).await.unwrap();
        assert_eq!(rows, 0, "Replies must be deleted with their comment");
    }
}

mod replies {
    use super::*;

    #[tokio::test]
    async fn user_can_reply_to_a_comment() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let story_id = app.create_story(&alice, "Commentable").await;
        let comment_id = app.create_comment(story_id, &alice, "what do you think?").await;

        let res = app
            .post_with_token(
                &routes::comment_replies(comment_id),
                &json!({"text": "I think it's great"}),
                &bob,
            )
            .await;

        assert_eq!(res.status, 201, "Reply failed: {}", res.text);
        assert_eq!(res.body["comment_id"], comment_id);
        assert_eq!(res.body["user"]["username"], "bob");
    }

    #[tokio::test]
    async fn replies_appear_oldest_first_under_their_comment() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let story_id = app.create_story(&alice, "Commentable").await;
        let comment_id = app.create_comment(story_id, &alice, "thread root").await;

        for text in ["reply one", "reply two"] {
            let res = app
                .post_with_token(
                    &routes::comment_replies(comment_id),
                    &json!({"text": text}),
                    &alice,
                )
                .await;
            assert_eq!(res.status, 201);
        }

        let res = app.get_without_token(&routes::story(story_id)).await;
        let replies = res.body["comments"][0]["replies"].as_array().unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["text"], "reply one");
        assert_eq!(replies[1]["text"], "reply two");
    }

    #[tokio::test]
    async fn empty_reply_is_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let story_id = app.create_story(&alice, "Commentable").await;
        let comment_id = app.create_comment(story_id, &alice, "root").await;

        let res = app
            .post_with_token(
                &routes::comment_replies(comment_id),
                &json!({"text": ""}),
                &alice,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn non_author_cannot_delete_a_reply() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let story_id = app.create_story(&alice, "Commentable").await;
        let comment_id = app.create_comment(story_id, &alice, "root").await;

        let reply = app
            .post_with_token(
                &routes::comment_replies(comment_id),
                &json!({"text": "mine"}),
                &alice,
            )
            .await;
        let reply_id = reply.id();

        let res = app.delete_with_token(&routes::reply(reply_id), &bob).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}
