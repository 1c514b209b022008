mod common;

use axum::http::{header, StatusCode};
use common::TestApp;

#[tokio::test]
async fn nurse_downloads_pdf_report() {
    let mut nurse = TestApp::new().await;
    nurse.login_as_nurse("suster_ani").await;
    let id = nurse
        .create_patient(&[
            ("patient_name", "Budi Santoso"),
            ("emergency_phone_number", "081234567890"),
            ("priority", "1"),
        ])
        .await;
    nurse.set_condition(id, "Demam tinggi").await;
    nurse.set_condition(id, "Membaik").await;

    let res = nurse.get(&format!("/patient/{id}/report")).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.headers.get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    let disposition = res
        .headers
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains("Laporan_Budi_Santoso.pdf"));
    assert!(res.body.starts_with(b"%PDF"));
}

#[tokio::test]
async fn report_without_history_still_renders() {
    let mut nurse = TestApp::new().await;
    nurse.login_as_nurse("suster_ani").await;
    let id = nurse.create_patient(&[("patient_name", "Wati")]).await;

    let res = nurse.get(&format!("/patient/{id}/report")).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.starts_with(b"%PDF"));
}

#[tokio::test]
async fn anonymous_report_request_goes_to_login() {
    let mut nurse = TestApp::new().await;
    nurse.login_as_nurse("suster_ani").await;
    let id = nurse.create_patient(&[("patient_name", "Wati")]).await;

    let mut anonymous = nurse.other_client();
    anonymous
        .get(&format!("/patient/{id}/report"))
        .await
        .assert_redirect("/login");
    let page = anonymous.get("/login").await;
    assert!(page.text().contains("Hanya perawat yang dapat mengakses laporan!"));
}
