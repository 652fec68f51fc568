use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;

use server::entity::follow;

use crate::common::{TestApp, routes};

mod profile_view {
    use super::*;

    #[tokio::test]
    async fn user_can_view_another_users_profile() {
        let app = TestApp::spawn().await;
        let _alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;

        let res = app.get_with_token(&routes::profile("alice"), &bob).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["username"], "alice");
        assert_eq!(res.body["is_following"], false);
        assert_eq!(res.body["followers_count"], 0);
    }

    #[tokio::test]
    async fn own_profile_has_no_is_following_flag() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;

        let res = app.get_with_token(&routes::profile("alice"), &alice).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["is_following"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn unknown_username_returns_not_found() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;

        let res = app.get_with_token(&routes::profile("nobody"), &alice).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod profile_edit {
    use super::*;

    #[tokio::test]
    async fn user_can_set_and_clear_their_bio() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .patch_with_token(
                routes::MY_PROFILE,
                &json!({"bio": "I write short fiction."}),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "Bio update failed: {}", res.text);
        assert_eq!(res.body["bio"], "I write short fiction.");

        let res = app
            .patch_with_token(routes::MY_PROFILE, &json!({"bio": null}), &token)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["bio"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn overlong_bio_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .patch_with_token(
                routes::MY_PROFILE,
                &json!({"bio": "b".repeat(501)}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn patch_without_bio_field_leaves_bio_unchanged() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        app.patch_with_token(routes::MY_PROFILE, &json!({"bio": "keep me"}), &token)
            .await;
        let res = app
            .patch_with_token(routes::MY_PROFILE, &json!({}), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["bio"], "keep me");
    }
}

mod avatar {
    use super::*;

    #[tokio::test]
    async fn user_can_upload_and_download_an_avatar() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let part = reqwest::multipart::Part::bytes(vec![0x89, 0x50, 0x4E, 0x47])
            .file_name("me.png")
            .mime_str("image/png")
            .unwrap();
        let form = reqwest::multipart::Form::new().part("file", part);

        let res = app
            .upload_multipart_with_token(routes::MY_AVATAR, form, &token)
            .await;
        assert_eq!(res.status, 200, "Avatar upload failed: {}", res.text);
        assert_eq!(res.body["has_avatar"], true);

        let res = app.get_without_token(&routes::avatar("alice")).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.text.as_bytes(), [0x89, 0x50, 0x4E, 0x47]);
    }

    #[tokio::test]
    async fn avatar_of_user_without_one_is_not_found() {
        let app = TestApp::spawn().await;
        let _token = app.create_authenticated_user("alice", "securepass").await;

        let res = app.get_without_token(&routes::avatar("alice")).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn upload_without_file_field_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let form = reqwest::multipart::Form::new().text("other", "value");
        let res = app
            .upload_multipart_with_token(routes::MY_AVATAR, form, &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod follow_toggle {
    use super::*;

    #[tokio::test]
    async fn first_toggle_follows_second_toggle_unfollows() {
        let app = TestApp::spawn().await;
        let _alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;

        let res = app
            .post_empty_with_token(&routes::follow("alice"), &bob)
            .await;
        assert_eq!(res.status, 200, "Follow failed: {}", res.text);
        assert_eq!(res.body["following"], true);
        assert_eq!(res.body["followers_count"], 1);

        let count = follow::Entity::find().count(&app.db).await.unwrap();
        assert_eq!(count, 1, "Follow toggle should create exactly one row");

        let res = app
            .post_empty_with_token(&routes::follow("alice"), &bob)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["following"], false);
        assert_eq!(res.body["followers_count"], 0);

        let count = follow::Entity::find().count(&app.db).await.unwrap();
        assert_eq!(count, 0, "Unfollow should remove the row");
    }

    #[tokio::test]
    async fn follow_is_reflected_in_profile_counts() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;

        app.post_empty_with_token(&routes::follow("alice"), &bob)
            .await;

        let res = app.get_with_token(&routes::profile("alice"), &bob).await;
        assert_eq!(res.body["followers_count"], 1);
        assert_eq!(res.body["is_following"], true);

        let res = app.get_with_token(&routes::profile("bob"), &alice).await;
        assert_eq!(res.body["following_count"], 1);
    }

    #[tokio::test]
    async fn user_cannot_follow_themselves() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .post_empty_with_token(&routes::follow("alice"), &alice)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn following_requires_authentication() {
        let app = TestApp::spawn().await;
        let _alice = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .client
            .post(format!("http://{}{}", app.addr, routes::follow("alice")))
            .send()
            .await
            .expect("Failed to send request");
        let res = crate::common::TestResponse::from_response(res).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }
}
