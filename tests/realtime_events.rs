mod common;

use axum::http::{header, StatusCode};
use common::TestApp;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use ward_status::routes::events::answer_request;
use ward_status::services::event_stream::{ClientRequest, RealtimeEvent};

#[tokio::test]
async fn mutations_fan_out_to_subscribers() {
    let mut nurse = TestApp::new().await;
    nurse.login_as_nurse("suster_ani").await;
    let mut rx = nurse.state.notifier.subscribe();

    let id = nurse
        .create_patient(&[("patient_name", "Budi"), ("priority", "1")])
        .await;
    match rx.try_recv().unwrap() {
        // still without a condition, so the public list is empty
        RealtimeEvent::PatientListUpdate { patients } => assert!(patients.is_empty()),
        other => panic!("unexpected {other:?}"),
    }

    nurse.set_condition(id, "Stabil").await;
    let event = rx.try_recv().unwrap();
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["event"], "patient_data_update");
    assert_eq!(json["patient"]["condition"], "Stabil");
    assert_eq!(json["history"].as_array().unwrap().len(), 1);
    assert!(json["hospital"]["address"].is_string());
    assert!(json["patient"].get("access_key").is_none());

    nurse
        .post_form(&format!("/patient/{id}"), &[("priority", "2")])
        .await
        .assert_redirect(&format!("/patient/{id}"));
    match rx.try_recv().unwrap() {
        RealtimeEvent::PatientListUpdate { patients } => {
            assert_eq!(patients.len(), 1);
            assert_eq!(patients[0].priority, 2);
        }
        other => panic!("unexpected {other:?}"),
    }

    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn rejected_mutations_publish_nothing() {
    let mut nurse = TestApp::new().await;
    nurse.login_as_nurse("suster_ani").await;
    let mut rx = nurse.state.notifier.subscribe();

    nurse
        .post_form("/nurse", &[("patient_name", "Budi"), ("phone_number", "1")])
        .await
        .assert_redirect("/nurse");
    nurse
        .post_form("/patient/7", &[("condition", "Stabil")])
        .await
        .assert_redirect("/nurse");
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn pull_requests_are_answered_from_current_state() {
    let mut nurse = TestApp::new().await;
    nurse.login_as_nurse("suster_ani").await;
    let id = nurse.create_patient(&[("patient_name", "Budi")]).await;
    nurse.set_condition(id, "Membaik").await;

    let reply = answer_request(&nurse.state, ClientRequest::RequestPatientList)
        .await
        .unwrap();
    match reply {
        Some(RealtimeEvent::PatientListUpdate { patients }) => {
            assert_eq!(patients.len(), 1);
            assert_eq!(patients[0].condition, "Membaik");
        }
        other => panic!("unexpected {other:?}"),
    }

    let reply = answer_request(&nurse.state, ClientRequest::RequestPatientData { patient_id: id })
        .await
        .unwrap();
    match reply {
        Some(RealtimeEvent::PatientDataUpdate { patient, history, .. }) => {
            assert_eq!(patient.id, id);
            assert_eq!(history[0].condition, "Membaik");
        }
        other => panic!("unexpected {other:?}"),
    }

    let reply = answer_request(&nurse.state, ClientRequest::RequestPatientData { patient_id: 404 })
        .await
        .unwrap();
    assert!(reply.is_none());
}

async fn next_message(
    socket: &mut (impl futures::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin),
) -> serde_json::Value {
    loop {
        let message = timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("message in time")
            .expect("socket open")
            .unwrap();
        if let WsMessage::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn event_stream_delivers_named_events() {
    let app = TestApp::new().await;
    let res = app.open("/events").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );

    app.state
        .notifier
        .publish(RealtimeEvent::PatientListUpdate { patients: vec![] });

    let mut body = res.into_body().into_data_stream();
    let mut text = String::new();
    while !text.contains("\n\n") {
        let chunk = timeout(Duration::from_secs(5), body.next())
            .await
            .expect("event in time")
            .expect("stream open")
            .unwrap();
        text.push_str(&String::from_utf8_lossy(&chunk));
    }
    assert!(text.contains("event: patient_list_update"), "got {text}");
    assert!(text.contains(r#"data: {"event":"patient_list_update","patients":[]}"#));
}

#[tokio::test]
async fn websocket_answers_requests_and_forwards_broadcasts() {
    let mut nurse = TestApp::new().await;
    nurse.login_as_nurse("suster_ani").await;
    let id = nurse.create_patient(&[("patient_name", "Budi")]).await;
    nurse.set_condition(id, "Stabil").await;

    let addr = nurse.serve().await;
    let (mut socket, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();

    // malformed requests are skipped and the connection stays usable
    socket.send(WsMessage::Text("not json".into())).await.unwrap();
    socket
        .send(WsMessage::Text(r#"{"event":"request_patient_list"}"#.into()))
        .await
        .unwrap();
    let reply = next_message(&mut socket).await;
    assert_eq!(reply["event"], "patient_list_update");
    assert_eq!(reply["patients"][0]["condition"], "Stabil");

    socket
        .send(WsMessage::Text(
            format!(r#"{{"event":"request_patient_data","patient_id":{id}}}"#).into(),
        ))
        .await
        .unwrap();
    let reply = next_message(&mut socket).await;
    assert_eq!(reply["event"], "patient_data_update");
    assert_eq!(reply["patient"]["id"], id);
    assert!(reply["patient"].get("access_key").is_none());

    nurse.set_condition(id, "Membaik").await;
    let pushed = next_message(&mut socket).await;
    assert_eq!(pushed["event"], "patient_data_update");
    assert_eq!(pushed["patient"]["condition"], "Membaik");
    assert_eq!(pushed["history"].as_array().unwrap().len(), 2);
}
