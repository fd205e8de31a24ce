mod common;

use actix_web::{http::StatusCode, test};
use blog_service::build_app;
use serde_json::Value;

use common::{bearer, location, test_env};

#[actix_web::test]
async fn following_twice_creates_one_edge() {
    let env = test_env();
    let leo = env.user("leo").await;
    let mia = env.user("mia").await;
    let app = test::init_service(build_app(env.state.clone())).await;

    for _ in 0..2 {
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/profile/leo/follow/")
                .insert_header(bearer(&mia))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/profile/leo/");
    }

    assert_eq!(env.store.follows.count_followers(leo.id).await.unwrap(), 1);
    assert!(env.store.follows.is_following(mia.id, leo.id).await.unwrap());
}

#[actix_web::test]
async fn self_follow_and_missing_unfollow_are_noops() {
    let env = test_env();
    let leo = env.user("leo").await;
    env.user("mia").await;
    let app = test::init_service(build_app(env.state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/profile/leo/follow/")
            .insert_header(bearer(&leo))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(env.store.follows.count_following(leo.id).await.unwrap(), 0);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/profile/mia/unfollow/")
            .insert_header(bearer(&leo))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/mia/");
}

#[actix_web::test]
async fn unfollow_removes_the_edge() {
    let env = test_env();
    let leo = env.user("leo").await;
    let mia = env.user("mia").await;
    env.store.follows.create_follow(mia.id, leo.id).await.unwrap();
    let app = test::init_service(build_app(env.state.clone())).await;

    test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/profile/leo/unfollow/")
            .insert_header(bearer(&mia))
            .to_request(),
    )
    .await;
    assert!(!env.store.follows.is_following(mia.id, leo.id).await.unwrap());
}

#[actix_web::test]
async fn followed_posts_reach_only_followers() {
    let env = test_env();
    let leo = env.user("leo").await;
    let mia = env.user("mia").await;
    let zoe = env.user("zoe").await;
    env.store.follows.create_follow(mia.id, leo.id).await.unwrap();
    env.post(&leo, None, "For my followers").await;
    let app = test::init_service(build_app(env.state.clone())).await;

    let follower: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/follow/")
            .insert_header(bearer(&mia))
            .to_request(),
    )
    .await;
    assert_eq!(follower["page_obj"]["object_list"][0]["text"], "For my followers");

    let stranger: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/follow/")
            .insert_header(bearer(&zoe))
            .to_request(),
    )
    .await;
    assert_eq!(stranger["page_obj"]["object_list"].as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn anonymous_follow_redirects_to_login() {
    let env = test_env();
    let leo = env.user("leo").await;
    let app = test::init_service(build_app(env.state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri("/profile/leo/follow/").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=/profile/leo/follow/");
    assert_eq!(env.store.follows.count_followers(leo.id).await.unwrap(), 0);
}

#[actix_web::test]
async fn following_unknown_user_is_not_found() {
    let env = test_env();
    let mia = env.user("mia").await;
    let app = test::init_service(build_app(env.state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/profile/ghost/follow/")
            .insert_header(bearer(&mia))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
