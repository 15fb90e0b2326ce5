//! Like/save/follow/comment mutations and their notification side effects.

#[macro_use]
mod common;

use std::sync::Arc;

use actix_web::test;
use chrono::Utc;
use serde_json::json;
use timeline_service::db::MemoryStore;
use timeline_service::models::{NotificationKind, Post, User};

use common::{actor, body};

async fn owner_and_fan() -> (Arc<MemoryStore>, User, User, Post) {
    let store = Arc::new(MemoryStore::new());
    let owner = store.insert_user("owner", None).await;
    let fan = store.insert_user("fan", None).await;
    let post = store
        .insert_post(owner.id, Some("hello world"), None, Utc::now())
        .await;
    (store, owner, fan, post)
}

#[actix_web::test]
async fn test_like_twice_conflicts() {
    let (store, owner, fan, post) = owner_and_fan().await;
    let app = spawn_app!(store.clone());
    let uri = format!("/posts/{}/like", post.id);

    let req = test::TestRequest::post()
        .uri(&uri)
        .set_json(actor(&fan))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let json = body(resp).await;
    assert_eq!(json["data"], json!({ "isLiked": true, "likesCount": 1 }));

    let req = test::TestRequest::post()
        .uri(&uri)
        .set_json(actor(&fan))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let json = body(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Post already liked");

    // Only the first like notified the owner
    let notifications = store.notifications().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].recipient_id, owner.id);
    assert_eq!(notifications[0].actor_id, fan.id);
    assert_eq!(notifications[0].kind, NotificationKind::Like);
    assert_eq!(notifications[0].post_id, Some(post.id));
}

#[actix_web::test]
async fn test_unlike_twice_never_errors() {
    let (store, _owner, fan, post) = owner_and_fan().await;
    let app = spawn_app!(store.clone());
    let uri = format!("/posts/{}/like", post.id);

    let req = test::TestRequest::post()
        .uri(&uri)
        .set_json(actor(&fan))
        .to_request();
    test::call_service(&app, req).await;

    for _ in 0..2 {
        let req = test::TestRequest::delete()
            .uri(&uri)
            .set_json(actor(&fan))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let json = body(resp).await;
        assert_eq!(json["data"], json!({ "isLiked": false, "likesCount": 0 }));
    }
}

#[actix_web::test]
async fn test_save_conflict_and_silent_unsave() {
    let (store, _owner, fan, post) = owner_and_fan().await;
    let app = spawn_app!(store.clone());
    let uri = format!("/posts/{}/save", post.id);

    let req = test::TestRequest::post()
        .uri(&uri)
        .set_json(actor(&fan))
        .to_request();
    assert_eq!(body(test::call_service(&app, req).await).await["data"]["isSaved"], true);

    let req = test::TestRequest::post()
        .uri(&uri)
        .set_json(actor(&fan))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(body(resp).await["error"], "Post already saved");

    for _ in 0..2 {
        let req = test::TestRequest::delete()
            .uri(&uri)
            .set_json(actor(&fan))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
    }

    assert!(store.notifications().await.is_empty());
}

#[actix_web::test]
async fn test_like_unknown_post_is_not_found() {
    let (store, _owner, fan, _post) = owner_and_fan().await;
    let app = spawn_app!(store);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/like", uuid::Uuid::new_v4()))
        .set_json(actor(&fan))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    assert_eq!(body(resp).await["error"], "Post not found");
}

#[actix_web::test]
async fn test_unknown_actor_is_not_found() {
    let (store, owner, _fan, post) = owner_and_fan().await;
    let app = spawn_app!(store.clone());
    let ghost = json!({ "userId": uuid::Uuid::new_v4() });

    for uri in [
        format!("/posts/{}/like", post.id),
        format!("/posts/{}/save", post.id),
        format!("/users/{}/follow", owner.id),
    ] {
        let req = test::TestRequest::post()
            .uri(&uri)
            .set_json(&ghost)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404, "{uri}");
        assert_eq!(body(resp).await["error"], "User not found");
    }

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/comments", post.id))
        .set_json(json!({ "userId": ghost["userId"], "content": "boo" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    assert!(store.notifications().await.is_empty());
}

#[actix_web::test]
async fn test_missing_user_id_is_validation_error() {
    let (store, _owner, _fan, post) = owner_and_fan().await;
    let app = spawn_app!(store);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/like", post.id))
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(body(resp).await["error"], "userId is required");
}

#[actix_web::test]
async fn test_malformed_path_id_uses_envelope() {
    let (store, _owner, fan, _post) = owner_and_fan().await;
    let app = spawn_app!(store);

    let req = test::TestRequest::post()
        .uri("/posts/12345/like")
        .set_json(actor(&fan))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let json = body(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Invalid id");
}

#[actix_web::test]
async fn test_self_follow_fails_without_edge() {
    let (store, owner, _fan, _post) = owner_and_fan().await;
    let app = spawn_app!(store.clone());

    let req = test::TestRequest::post()
        .uri(&format!("/users/{}/follow", owner.id))
        .set_json(actor(&owner))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(body(resp).await["error"], "Cannot follow yourself");

    assert!(!store.follow_exists(owner.id, owner.id).await);
    assert!(store.notifications().await.is_empty());
}

#[actix_web::test]
async fn test_follow_then_unfollow() {
    let (store, owner, fan, _post) = owner_and_fan().await;
    let app = spawn_app!(store.clone());
    let uri = format!("/users/{}/follow", owner.id);

    let req = test::TestRequest::post()
        .uri(&uri)
        .set_json(actor(&fan))
        .to_request();
    let json = body(test::call_service(&app, req).await).await;
    assert_eq!(json["data"], json!({ "isFollowing": true, "followersCount": 1 }));

    let req = test::TestRequest::post()
        .uri(&uri)
        .set_json(actor(&fan))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(body(resp).await["error"], "Already following this user");

    // Unfollow has no existence check
    for _ in 0..2 {
        let req = test::TestRequest::delete()
            .uri(&uri)
            .set_json(actor(&fan))
            .to_request();
        let json = body(test::call_service(&app, req).await).await;
        assert_eq!(json["data"], json!({ "isFollowing": false, "followersCount": 0 }));
    }

    let notifications = store.notifications().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Follow);
    assert_eq!(notifications[0].recipient_id, owner.id);
}

#[actix_web::test]
async fn test_self_actions_never_notify() {
    let (store, owner, _fan, post) = owner_and_fan().await;
    let app = spawn_app!(store.clone());

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/like", post.id))
        .set_json(actor(&owner))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/comments", post.id))
        .set_json(json!({ "userId": owner.id, "content": "my own post" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    assert!(store.notifications().await.is_empty());
}

#[actix_web::test]
async fn test_comment_notification_carries_first_hundred_chars() {
    let (store, owner, fan, post) = owner_and_fan().await;
    let app = spawn_app!(store.clone());
    let content: String = ('a'..='z').cycle().take(180).collect();

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/comments", post.id))
        .set_json(json!({ "userId": fan.id, "content": content }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let json = body(resp).await;
    assert_eq!(json["data"]["content"], content.as_str());
    assert_eq!(json["data"]["user"]["username"], "fan");

    let notifications = store.notifications().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].recipient_id, owner.id);
    assert_eq!(notifications[0].kind, NotificationKind::Comment);
    assert_eq!(notifications[0].message.as_deref(), Some(&content[..100]));
}

#[actix_web::test]
async fn test_blank_comment_is_rejected() {
    let (store, _owner, fan, post) = owner_and_fan().await;
    let app = spawn_app!(store.clone());

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/comments", post.id))
        .set_json(json!({ "userId": fan.id, "content": "   " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(body(resp).await["error"], "Comment content cannot be empty");
    assert!(store.notifications().await.is_empty());
}

#[actix_web::test]
async fn test_only_owner_edits_post() {
    let (store, owner, fan, post) = owner_and_fan().await;
    let app = spawn_app!(store.clone());
    let uri = format!("/posts/{}", post.id);

    let req = test::TestRequest::patch()
        .uri(&uri)
        .set_json(json!({ "userId": fan.id, "caption": "hijacked" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);

    let req = test::TestRequest::patch()
        .uri(&uri)
        .set_json(json!({ "userId": owner.id, "caption": "edited", "location": "Lisbon" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let json = body(resp).await;
    assert_eq!(json["data"]["caption"], "edited");
    assert_eq!(json["data"]["location"], "Lisbon");

    let req = test::TestRequest::get()
        .uri(&format!("{uri}?userId={}", fan.id))
        .to_request();
    let json = body(test::call_service(&app, req).await).await;
    assert_eq!(json["data"]["caption"], "edited");
    assert_eq!(json["data"]["isLiked"], false);
}
