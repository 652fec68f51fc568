use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;

use server::entity::like;

use crate::common::{TestApp, routes};

mod story_upload {
    use super::*;

    #[tokio::test]
    async fn user_can_upload_a_story() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let part = reqwest::multipart::Part::bytes(b"It was a dark and stormy night.".to_vec())
            .file_name("night.txt")
            .mime_str("text/plain")
            .unwrap();
        let form = reqwest::multipart::Form::new()
            .text("title", "Stormy Night")
            .text("description", "A very short story.")
            .part("file", part);

        let res = app
            .upload_multipart_with_token(routes::STORIES, form, &token)
            .await;

        assert_eq!(res.status, 201, "Upload failed: {}", res.text);
        assert_eq!(res.body["title"], "Stormy Night");
        assert_eq!(res.body["author"]["username"], "alice");
        assert_eq!(res.body["file_name"], "night.txt");
        assert_eq!(res.body["like_count"], 0);
        assert_eq!(res.body["liked"], false);
    }

    #[tokio::test]
    async fn upload_without_title_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let part = reqwest::multipart::Part::bytes(b"text".to_vec())
            .file_name("s.txt")
            .mime_str("text/plain")
            .unwrap();
        let form = reqwest::multipart::Form::new()
            .text("description", "desc")
            .part("file", part);

        let res = app
            .upload_multipart_with_token(routes::STORIES, form, &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn upload_with_unknown_category_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let part = reqwest::multipart::Part::bytes(b"text".to_vec())
            .file_name("s.txt")
            .mime_str("text/plain")
            .unwrap();
        let form = reqwest::multipart::Form::new()
            .text("title", "Title")
            .text("description", "desc")
            .text("category_id", "99999")
            .part("file", part);

        let res = app
            .upload_multipart_with_token(routes::STORIES, form, &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn uploaded_file_can_be_downloaded_back() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let id = app.create_story(&token, "Round Trip").await;

        let res = app.get_without_token(&routes::story_file(id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.text, "Once upon a time...");
    }
}

mod story_feed {
    use super::*;

    #[tokio::test]
    async fn feed_lists_stories_newest_first() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        app.create_story(&token, "First").await;
        app.create_story(&token, "Second").await;

        let res = app.get_without_token(routes::STORIES).await;

        assert_eq!(res.status, 200);
        let data = res.body["data"].as_array().expect("data should be array");
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["title"], "Second");
        assert_eq!(data[1]["title"], "First");
        assert_eq!(res.body["pagination"]["total"], 2);
    }

    #[tokio::test]
    async fn feed_can_be_filtered_by_author() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        app.create_story(&alice, "Alice's Tale").await;
        app.create_story(&bob, "Bob's Tale").await;

        let res = app
            .get_without_token(&format!("{}?author=alice", routes::STORIES))
            .await;

        assert_eq!(res.status, 200);
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["title"], "Alice's Tale");
    }

    #[tokio::test]
    async fn feed_is_paginated() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        for i in 0..3 {
            app.create_story(&token, &format!("Story {i}")).await;
        }

        let res = app
            .get_without_token(&format!("{}?page=2&per_page=2", routes::STORIES))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
        assert_eq!(res.body["pagination"]["total_pages"], 2);
    }

    #[tokio::test]
    async fn unknown_story_returns_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(&routes::story(424242)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod story_edit {
    use super::*;

    #[tokio::test]
    async fn author_can_edit_story_metadata() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let id = app.create_story(&token, "Draft Title").await;

        let res = app
            .patch_with_token(&routes::story(id), &json!({"title": "Final Title"}), &token)
            .await;

        assert_eq!(res.status, 200, "Edit failed: {}", res.text);
        assert_eq!(res.body["title"], "Final Title");
    }

    #[tokio::test]
    async fn non_author_cannot_edit_a_story() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let id = app.create_story(&alice, "Alice's Story").await;

        let res = app
            .patch_with_token(&routes::story(id), &json!({"title": "Hijacked"}), &bob)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn author_can_delete_their_story() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let id = app.create_story(&token, "Ephemeral").await;
        app.create_comment(id, &token, "commenting on my own story")
            .await;

        let res = app.delete_with_token(&routes::story(id), &token).await;
        assert_eq!(res.status, 204);

        let res = app.get_without_token(&routes::story(id)).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn non_author_cannot_delete_a_story() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let id = app.create_story(&alice, "Alice's Story").await;

        let res = app.delete_with_token(&routes::story(id), &bob).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

mod like_toggle {
    use super::*;

    #[tokio::test]
    async fn first_toggle_likes_second_toggle_unlikes() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let id = app.create_story(&alice, "Likeable").await;

        let res = app.post_empty_with_token(&routes::story_like(id), &bob).await;
        assert_eq!(res.status, 200, "Like failed: {}", res.text);
        assert_eq!(res.body["liked"], true);
        assert_eq!(res.body["count"], 1);

        let rows = like::Entity::find().count(&app.db).await.unwrap();
        assert_eq!(rows, 1, "Like toggle should create exactly one row");

        let res = app.post_empty_with_token(&routes::story_like(id), &bob).await;
        assert_eq!(res.body["liked"], false);
        assert_eq!(res.body["count"], 0);

        let rows = like::Entity::find().count(&app.db).await.unwrap();
        assert_eq!(rows, 0, "Unlike should remove the row");
    }

    #[tokio::test]
    async fn double_toggle_restores_original_count() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let carol = app.create_authenticated_user("carol", "securepass").await;
        let id = app.create_story(&alice, "Popular").await;

        app.post_empty_with_token(&routes::story_like(id), &carol)
            .await;
        app.post_empty_with_token(&routes::story_like(id), &bob).await;
        let res = app.post_empty_with_token(&routes::story_like(id), &bob).await;

        assert_eq!(res.body["liked"], false);
        assert_eq!(res.body["count"], 1);
    }

    #[tokio::test]
    async fn liked_flag_is_per_viewer() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let id = app.create_story(&alice, "Likeable").await;

        app.post_empty_with_token(&routes::story_like(id), &bob).await;

        let res = app.get_with_token(&routes::story(id), &bob).await;
        assert_eq!(res.body["liked"], true);

        let res = app.get_with_token(&routes::story(id), &alice).await;
        assert_eq!(res.body["liked"], false);

        let res = app.get_without_token(&routes::story(id)).await;
        assert_eq!(res.body["liked"], false);
    }

    #[tokio::test]
    async fn liking_requires_authentication() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let id = app.create_story(&alice, "Likeable").await;

        let res = app
            .client
            .post(format!("http://{}{}", app.addr, routes::story_like(id)))
            .send()
            .await
            .expect("Failed to send request");
        let res = crate::common::TestResponse::from_response(res).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }
}

mod categories {
    use super::*;

    #[tokio::test]
    async fn default_categories_are_seeded() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::CATEGORIES).await;

        assert_eq!(res.status, 200);
        let categories = res.body["categories"].as_array().unwrap();
        assert_eq!(categories.len(), 5);
        let names: Vec<&str> = categories
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"Fiction"));
        assert!(names.contains(&"Poetry"));
    }

    #[tokio::test]
    async fn reseeding_inserts_nothing_and_keeps_category_count() {
        let app = TestApp::spawn().await;

        // The test database is created from a pre-seeded template, so a
        // second seeding run must report zero insertions.
        let inserted = server::seed::seed_categories(&app.db)
            .await
            .expect("Reseeding should succeed");
        assert_eq!(inserted, 0);

        let res = app.get_without_token(routes::CATEGORIES).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["categories"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn story_can_be_filed_under_a_category() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let cats = app.get_without_token(routes::CATEGORIES).await;
        let fiction_id = cats.body["categories"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["name"] == "Fiction")
            .unwrap()["id"]
            .as_i64()
            .unwrap();

        let part = reqwest::multipart::Part::bytes(b"text".to_vec())
            .file_name("s.txt")
            .mime_str("text/plain")
            .unwrap();
        let form = reqwest::multipart::Form::new()
            .text("title", "Categorized")
            .text("description", "desc")
            .text("category_id", fiction_id.to_string())
            .part("file", part);

        let res = app
            .upload_multipart_with_token(routes::STORIES, form, &token)
            .await;
        assert_eq!(res.status, 201, "Upload failed: {}", res.text);
        assert_eq!(res.body["category"], "Fiction");

        let res = app
            .get_without_token(&format!("{}?category_id={fiction_id}", routes::STORIES))
            .await;
        assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
    }
}
