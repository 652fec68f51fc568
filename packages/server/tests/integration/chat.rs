use serde_json::json;

use crate::common::{TestApp, routes};

mod sending {
    use super::*;

    #[tokio::test]
    async fn user_can_send_a_direct_message() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let _bob = app.create_authenticated_user("bob", "securepass").await;

        let res = app
            .post_with_token(
                &routes::conversation("bob"),
                &json!({"content": "hi bob"}),
                &alice,
            )
            .await;

        assert_eq!(res.status, 201, "Send failed: {}", res.text);
        assert_eq!(res.body["content"], "hi bob");
        assert!(res.body["sent_at"].is_string());
    }

    #[tokio::test]
    async fn user_cannot_message_themselves() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .post_with_token(
                &routes::conversation("alice"),
                &json!({"content": "dear diary"}),
                &alice,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let _bob = app.create_authenticated_user("bob", "securepass").await;

        let res = app
            .post_with_token(
                &routes::conversation("bob"),
                &json!({"content": "   "}),
                &alice,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn messaging_an_unknown_user_returns_not_found() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .post_with_token(
                &routes::conversation("nobody"),
                &json!({"content": "hello?"}),
                &alice,
            )
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod conversation_view {
    use super::*;

    #[tokio::test]
    async fn conversation_shows_both_directions_oldest_first() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;

        app.post_with_token(
            &routes::conversation("bob"),
            &json!({"content": "hi bob"}),
            &alice,
        )
        .await;
        app.post_with_token(
            &routes::conversation("alice"),
            &json!({"content": "hi alice"}),
            &bob,
        )
        .await;
        app.post_with_token(
            &routes::conversation("bob"),
            &json!({"content": "how are you?"}),
            &alice,
        )
        .await;

        let res = app.get_with_token(&routes::conversation("bob"), &alice).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["partner"]["username"], "bob");
        let messages = res.body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["content"], "hi bob");
        assert_eq!(messages[1]["content"], "hi alice");
        assert_eq!(messages[2]["content"], "how are you?");
    }

    #[tokio::test]
    async fn conversation_with_no_messages_is_empty() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let _bob = app.create_authenticated_user("bob", "securepass").await;

        let res = app.get_with_token(&routes::conversation("bob"), &alice).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["messages"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn third_parties_do_not_see_the_conversation() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let _bob = app.create_authenticated_user("bob", "securepass").await;
        let carol = app.create_authenticated_user("carol", "securepass").await;

        app.post_with_token(
            &routes::conversation("bob"),
            &json!({"content": "secret"}),
            &alice,
        )
        .await;

        let res = app.get_with_token(&routes::conversation("bob"), &carol).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["messages"].as_array().unwrap().len(), 0);
    }
}

mod inbox {
    use super::*;

    #[tokio::test]
    async fn inbox_has_one_entry_per_partner_ordered_by_recency() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let _bob = app.create_authenticated_user("bob", "securepass").await;
        let _carol = app.create_authenticated_user("carol", "securepass").await;

        app.post_with_token(
            &routes::conversation("bob"),
            &json!({"content": "first to bob"}),
            &alice,
        )
        .await;
        app.post_with_token(
            &routes::conversation("carol"),
            &json!({"content": "to carol"}),
            &alice,
        )
        .await;
        app.post_with_token(
            &routes::conversation("bob"),
            &json!({"content": "again to bob"}),
            &alice,
        )
        .await;

        let res = app.get_with_token(routes::CHAT, &alice).await;

        assert_eq!(res.status, 200);
        let conversations = res.body["conversations"].as_array().unwrap();
        assert_eq!(conversations.len(), 2, "One entry per partner: {}", res.text);
        assert_eq!(conversations[0]["partner"]["username"], "bob");
        assert_eq!(conversations[0]["last_message"], "again to bob");
        assert_eq!(conversations[1]["partner"]["username"], "carol");
    }

    #[tokio::test]
    async fn received_messages_also_appear_in_inbox() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;

        app.post_with_token(
            &routes::conversation("alice"),
            &json!({"content": "bob reaching out"}),
            &bob,
        )
        .await;

        let res = app.get_with_token(routes::CHAT, &alice).await;

        let conversations = res.body["conversations"].as_array().unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0]["partner"]["username"], "bob");
        assert_eq!(conversations[0]["last_message"], "bob reaching out");
    }

    #[tokio::test]
    async fn inbox_requires_authentication() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::CHAT).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }
}
