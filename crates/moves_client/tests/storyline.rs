use moves_client::http_client::ReqwestMovesClient;
use moves_client::{FetchOptions, MovesClient, MovesError, Segment};
use secrecy::SecretString;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ReqwestMovesClient {
    ReqwestMovesClient::new(&server.uri(), SecretString::new("tok".into()))
}

#[tokio::test]
async fn fetch_day_sends_bearer_token_and_parses_first_day() {
    let server = MockServer::start().await;
    let body = serde_json::json!([{
        "date": "20140305",
        "segments": [{
            "type": "place",
            "startTime": "20140305T000000+0100",
            "endTime": "20140305T080000+0100",
            "place": {"name": "Cafe", "type": "foursquare", "foursquareId": "4b0", "location": {"lat": 52.5, "lon": 13.4}}
        }]
    }]);

    Mock::given(method("GET"))
        .and(path("/api/v1/user/storyline/daily/20140305"))
        .and(query_param("trackPoints", "true"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let day = client_for(&server)
        .fetch_day("20140305", FetchOptions::default())
        .await
        .expect("day");
    assert_eq!(day.date, "20140305");
    assert_eq!(day.raw.as_ref(), Some(&body[0]));
    let segments = day.segments.expect("segments");
    assert!(matches!(&segments[0], Segment::Place(p) if p.place.foursquare_id.as_deref() == Some("4b0")));
}

#[tokio::test]
async fn fetch_day_forwards_track_points_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user/storyline/daily/20140306"))
        .and(query_param("trackPoints", "false"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{"date": "20140306", "segments": null}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let day = client_for(&server)
        .fetch_day("20140306", FetchOptions { track_points: false })
        .await
        .expect("day");
    assert!(day.segments.is_none());
}

#[tokio::test]
async fn fetch_day_empty_array_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user/storyline/daily/20140307"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch_day("20140307", FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MovesError::NotFound(_)));
}

#[tokio::test]
async fn fetch_day_maps_unauthorized_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user/storyline/daily/20140308"))
        .respond_with(ResponseTemplate::new(401).set_body_string("expired token"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch_day("20140308", FetchOptions::default())
        .await
        .unwrap_err();
    match err {
        MovesError::Auth(body) => assert_eq!(body, "expired token"),
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn fetch_day_invalid_json_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user/storyline/daily/20140309"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch_day("20140309", FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MovesError::Decode(_)));
}

#[tokio::test]
async fn get_profile_parses_nested_payload() {
    let server = MockServer::start().await;
    let body = serde_json::json!({
        "userId": 23138311640030064u64,
        "profile": {
            "firstDate": "20121211",
            "currentTimeZone": {"id": "Europe/Berlin", "offset": 3600}
        }
    });
    Mock::given(method("GET"))
        .and(path("/api/v1/user/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let profile = client_for(&server).get_profile().await.expect("profile");
    assert_eq!(profile.user_id, 23138311640030064);
    assert_eq!(profile.first_date, "20121211");
    assert_eq!(profile.time_zone.as_deref(), Some("Europe/Berlin"));
}
