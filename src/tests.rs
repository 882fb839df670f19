//! Integration tests for the agency backend.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::lookup::AuthorityLookup;
use crate::notify::{Notifier, OutboundEmail};
use crate::{create_router, AppState};

/// Fixed-table postcode lookup for tests.
struct FakeLookup {
    table: BTreeMap<String, String>,
}

#[async_trait]
impl AuthorityLookup for FakeLookup {
    async fn authority_for(&self, postcode: &str) -> Result<Option<String>, reqwest::Error> {
        Ok(self.table.get(&postcode.replace(' ', "")).cloned())
    }
}

/// Notifier that records outgoing emails instead of delivering them.
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, email: &OutboundEmail) -> Result<(), crate::errors::AppError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    sent_emails: Arc<Mutex<Vec<OutboundEmail>>>,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(Some("test-api-key".to_string())).await
    }

    async fn with_psk(psk: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        let config = Config {
            api_psk: psk.clone(),
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            postcode_api_url: "http://127.0.0.1:9".to_string(),
            default_authority: "Default Authority".to_string(),
        };

        let lookup = FakeLookup {
            table: [("LS14AP", "Leeds"), ("LS29JT", "Leeds"), ("YO17HH", "York")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };

        let sent_emails = Arc::new(Mutex::new(Vec::new()));
        let notifier = RecordingNotifier {
            sent: sent_emails.clone(),
        };

        let state = AppState {
            repo,
            config: Arc::new(config),
            lookup: Arc::new(lookup),
            notifier: Arc::new(notifier),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            sent_emails,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A form that passes every section validator.
    fn valid_form() -> Value {
        json!({
            "firstName": "Jane",
            "lastName": "Minder",
            "previousNames": [],
            "dateOfBirth": "1988-04-12",
            "niNumber": "AB123456C",
            "email": "jane@example.com",
            "phone": "0113 496 0000",
            "currentAddress": {
                "line1": "1 High Street",
                "town": "Leeds",
                "postcode": "LS1 4AP"
            },
            "addressHistory": [
                {
                    "address": { "line1": "2 Old Road", "town": "Leeds", "postcode": "LS2 9JT" },
                    "fromDate": "2019-01-01",
                    "toDate": "2022-06-01"
                },
                {
                    "address": { "line1": "3 Nowhere Lane", "town": "Elsewhere", "postcode": "NOWHERE" },
                    "fromDate": "2022-06-01",
                    "toDate": "2025-01-01"
                }
            ],
            "premisesDescription": "Ground-floor flat with enclosed garden",
            "capacity": { "underOne": 1, "oneToFive": 3, "fiveToEight": 2, "overEight": 0 },
            "qualifications": {
                "firstAid": {
                    "completed": true,
                    "provider": "St John Ambulance",
                    "dateAchieved": "2024-03-01",
                    "certificateNumber": "FA-2024-991"
                }
            },
            "employmentHistory": [
                {
                    "employer": "Little Oaks Nursery",
                    "role": "Nursery assistant",
                    "fromDate": "2016-09-01",
                    "toDate": "2019-01-01"
                }
            ],
            "referees": [
                { "name": "Sam Boss", "relationship": "Former manager", "email": "sam@example.com" },
                { "name": "Pat Friend", "relationship": "Colleague", "email": "pat@example.com" }
            ],
            "householdMembers": [
                {
                    "firstName": "Alex",
                    "lastName": "Minder",
                    "dateOfBirth": "1985-02-02",
                    "relationship": "Partner"
                },
                {
                    "firstName": "Robin",
                    "lastName": "Minder",
                    "dateOfBirth": "2010-05-05",
                    "relationship": "Child"
                }
            ],
            "vetting": {
                "hasDbs": true,
                "dbsNumber": "123456789012",
                "hasCriminalConvictions": false,
                "isDisqualified": false,
                "socialServicesInvolvement": false
            },
            "consentToChecks": true,
            "declarationAgreed": true,
            "signatureName": "Jane Minder",
            "signatureDate": "2025-06-01"
        })
    }

    async fn submit_valid_application(&self) -> String {
        let resp = self
            .client
            .post(self.url("/api/apply"))
            .json(&Self::valid_form())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_admin_routes_require_psk() {
    let fixture = TestFixture::new().await;

    // A client without the key is rejected on the admin API
    let anonymous = Client::new();
    let resp = anonymous
        .get(fixture.url("/api/applications"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    // But the public apply endpoint is open (fails validation, not auth)
    let resp = anonymous
        .post(fixture.url("/api/apply"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_submission_validates_every_section() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/apply"))
        .json(&json!({ "firstName": "Only" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    let fields = body["error"]["details"]["fields"].as_object().unwrap();
    // Errors from several sections are reported together
    assert!(fields.contains_key("lastName"));
    assert!(fields.contains_key("currentAddress.postcode"));
    assert!(fields.contains_key("declarationAgreed"));
}

#[tokio::test]
async fn test_short_dbs_number_rejected() {
    let fixture = TestFixture::new().await;

    let mut form = TestFixture::valid_form();
    form["vetting"]["dbsNumber"] = json!("12345");

    let resp = fixture
        .client
        .post(fixture.url("/api/apply"))
        .json(&form)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"]["details"]["fields"]
        .as_object()
        .unwrap()
        .contains_key("dbsNumber"));
}

#[tokio::test]
async fn test_resubmitted_application_token_conflicts() {
    let fixture = TestFixture::new().await;
    let token = "apply-token-1";

    // The applicant autosaved a draft before submitting
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/forms/{}/draft", token)))
        .json(&json!({ "revision": 1, "answers": { "firstName": "Jane" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let mut form = TestFixture::valid_form();
    form["draftToken"] = json!(token);

    let resp = fixture
        .client
        .post(fixture.url("/api/apply"))
        .json(&form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // The draft was cleared with the submission
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/forms/{}/draft", token)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // The submission is recorded as a spent application form under the token
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/forms/{}", token)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["kind"], "application");
    assert_eq!(body["data"]["status"], "submitted");

    // A retry under the same token must not create a second application
    let resp = fixture
        .client
        .post(fixture.url("/api/apply"))
        .json(&form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "ALREADY_SUBMITTED");

    let resp = fixture
        .client
        .get(fixture.url("/api/applications"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_section_validation_endpoint() {
    let fixture = TestFixture::new().await;

    let mut form = TestFixture::valid_form();
    form["vetting"]["dbsNumber"] = json!("12345");

    // Section 7 is suitability; the bad DBS number is reported there
    let resp = fixture
        .client
        .post(fixture.url("/api/apply/sections/7/validate"))
        .json(&form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["isValid"], false);
    assert!(body["data"]["errors"]
        .as_object()
        .unwrap()
        .contains_key("dbsNumber"));

    // The same form passes the personal details section
    let resp = fixture
        .client
        .post(fixture.url("/api/apply/sections/0/validate"))
        .json(&form)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["isValid"], true);

    // Out-of-range section index
    let resp = fixture
        .client
        .post(fixture.url("/api/apply/sections/99/validate"))
        .json(&form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_application_lifecycle() {
    let fixture = TestFixture::new().await;
    let id = fixture.submit_valid_application().await;

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/applications/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["firstName"], "Jane");

    // Declared household members were fanned out into compliance people
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/people?applicationId={}", id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_approval_is_idempotent() {
    let fixture = TestFixture::new().await;
    let id = fixture.submit_valid_application().await;

    // First approval converts
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/applications/{}/approve", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let first: Value = resp.json().await.unwrap();
    assert_eq!(first["data"]["created"], true);
    assert_eq!(first["data"]["peopleCopied"], 2);
    let employee_id = first["data"]["employeeId"].as_str().unwrap().to_string();

    // Second approval short-circuits to the same employee
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/applications/{}/approve", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let second: Value = resp.json().await.unwrap();
    assert_eq!(second["data"]["created"], false);
    assert_eq!(second["data"]["employeeId"], employee_id.as_str());

    // Exactly one employee exists for the application
    let resp = fixture
        .client
        .get(fixture.url("/api/employees"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let employees = body["data"].as_array().unwrap();
    assert_eq!(employees.len(), 1);
    assert_eq!(employees[0]["applicationId"], id.as_str());
    assert_eq!(employees[0]["employmentStatus"], "active");

    // People were copied, not moved: both sides still have their records
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/people?applicationId={}", id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/people?employeeId={}", employee_id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_rejected_application_cannot_be_approved() {
    let fixture = TestFixture::new().await;
    let id = fixture.submit_valid_application().await;

    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/applications/{}/reject", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "rejected");

    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/applications/{}/approve", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

    // Rejecting twice is also a violation
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/applications/{}/reject", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn test_draft_round_trip_with_nested_groups() {
    let fixture = TestFixture::new().await;
    let token = "local-draft-token";

    let answers = json!({
        "firstName": "Jane",
        "previousNames": [
            { "name": "Jane Smith" },
            { "name": "Jane Jones" }
        ],
        "addressHistory": [
            { "address": { "line1": "2 Old Road", "postcode": "LS2 9JT" } },
            { "address": { "line1": "3 Older Road", "postcode": "YO1 7HH" } }
        ],
        "employmentHistory": [
            { "employer": "A" },
            { "employer": "B" },
            { "employer": "C" }
        ]
    });

    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/forms/{}/draft", token)))
        .json(&json!({ "revision": 1, "answers": answers }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/forms/{}/draft", token)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["answers"], answers);
    assert_eq!(body["data"]["revision"], 1);
}

#[tokio::test]
async fn test_stale_draft_write_rejected() {
    let fixture = TestFixture::new().await;
    let token = "stale-draft-token";

    for revision in [1, 2] {
        let resp = fixture
            .client
            .put(fixture.url(&format!("/api/forms/{}/draft", token)))
            .json(&json!({ "revision": revision, "answers": { "n": revision } }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    // A write from an older session must not clobber newer answers
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/forms/{}/draft", token)))
        .json(&json!({ "revision": 1, "answers": { "n": "old" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "STALE_DRAFT");
    assert_eq!(body["error"]["details"]["currentRevision"], 2);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/forms/{}/draft", token)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["answers"]["n"], 2);
}

#[tokio::test]
async fn test_satellite_form_is_single_use() {
    let fixture = TestFixture::new().await;
    let id = fixture.submit_valid_application().await;

    // Create an assistant and send a DBS request to mint a form token
    let resp = fixture
        .client
        .post(fixture.url("/api/people"))
        .json(&json!({
            "role": "assistant",
            "applicationId": id,
            "firstName": "Aiden",
            "lastName": "Helper",
            "email": "aiden@example.com"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let person_id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/people/{}/dbs-request", person_id)))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let token = body["data"]["formToken"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["kind"], "assistant");

    // The satellite page sees a pending form
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/forms/{}", token)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "pending");

    // The person autosaves a draft while filling the form in
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/forms/{}/draft", token)))
        .json(&json!({ "revision": 1, "answers": { "declaration": "draft" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // First submission succeeds
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/forms/{}/submit", token)))
        .json(&json!({ "answers": { "declaration": "agreed" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "submitted");

    // and clears the saved draft
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/forms/{}/draft", token)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Second submission is rejected and response data is untouched
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/forms/{}/submit", token)))
        .json(&json!({ "answers": { "declaration": "tampered" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "ALREADY_SUBMITTED");

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/forms/{}", token)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "submitted");

    // Draft saves against a spent token are rejected too
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/forms/{}/draft", token)))
        .json(&json!({ "revision": 9, "answers": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // DBS lifecycle moved to requested and the reminder was recorded
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/people/{}", person_id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["dbsStatus"], "requested");
    assert_eq!(body["data"]["reminderCount"], 1);
}

#[tokio::test]
async fn test_dbs_lifecycle_and_derived_status() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/people"))
        .json(&json!({
            "role": "household_member",
            "applicationId": "app-1",
            "firstName": "Morgan",
            "lastName": "Member"
        }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let person_id = body["data"]["id"].as_str().unwrap().to_string();

    // not_requested -> received is not a legal transition
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/people/{}/dbs", person_id)))
        .json(&json!({ "dbsStatus": "received" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

    // not_requested -> requested -> received with an already-past expiry
    for payload in [
        json!({ "dbsStatus": "requested" }),
        json!({
            "dbsStatus": "received",
            "dbsCertificateNumber": "123456789012",
            "dbsCertificateDate": "2019-06-01",
            "dbsCertificateExpiry": "2022-06-01"
        }),
    ] {
        let resp = fixture
            .client
            .put(fixture.url(&format!("/api/people/{}/dbs", person_id)))
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    // Stored enum says received, derived status reports expired
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/people/{}/status", person_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["effectiveDbsStatus"], "expired");
    assert_eq!(body["data"]["severity"], "action");

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/people/{}", person_id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["dbsStatus"], "received");
}

#[tokio::test]
async fn test_authority_groups() {
    let fixture = TestFixture::new().await;
    let id = fixture.submit_valid_application().await;

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/applications/{}/authority-groups", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let groups = body["data"].as_object().unwrap();

    // Current (LS1 4AP) + one previous (LS2 9JT) resolve to Leeds; the
    // malformed previous address degrades to Unknown.
    assert_eq!(groups.len(), 2);
    assert_eq!(groups["Leeds"].as_array().unwrap().len(), 2);
    assert_eq!(groups["Unknown"].as_array().unwrap().len(), 1);
    assert!(groups["Leeds"]
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a["isCurrent"] == true));
}

#[tokio::test]
async fn test_authority_check_discloses_only_matching_addresses() {
    let fixture = TestFixture::new().await;
    let id = fixture.submit_valid_application().await;

    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/applications/{}/authority-checks", id)))
        .json(&json!({
            "authorityName": "Leeds",
            "recipientEmail": "checks@leeds.gov.uk"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["kind"], "local_authority");
    assert_eq!(body["data"]["authorityName"], "Leeds");

    let sent = fixture.sent_emails.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let addresses = sent[0].payload["addresses"].as_array().unwrap();
    assert_eq!(addresses.len(), 2, "only Leeds addresses are disclosed");

    // An authority with no matching addresses is refused
    drop(sent);
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/applications/{}/authority-checks", id)))
        .json(&json!({
            "authorityName": "Somewhere Else",
            "recipientEmail": "checks@elsewhere.gov.uk"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_reference_requests_reuse_pending_tokens() {
    let fixture = TestFixture::new().await;
    let id = fixture.submit_valid_application().await;

    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/applications/{}/reference-requests", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let first: Vec<String> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["formToken"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(first.len(), 2);

    // Resending reuses the open tokens instead of minting new ones
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/applications/{}/reference-requests", id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let second: Vec<String> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["formToken"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(first, second);

    assert_eq!(fixture.sent_emails.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn test_ofsted_check_records_pending_form() {
    let fixture = TestFixture::new().await;
    let id = fixture.submit_valid_application().await;

    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/applications/{}/ofsted-check", id)))
        .json(&json!({ "recipientEmail": "checks@ofsted.gov.uk" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["kind"], "ofsted");
    assert_eq!(body["data"]["status"], "pending");

    let sent = fixture.sent_emails.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "checks@ofsted.gov.uk");
    assert_eq!(sent[0].payload["applicantName"], "Jane Minder");
}

#[tokio::test]
async fn test_unknown_form_token_is_not_found() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/forms/no-such-token"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let resp = fixture
        .client
        .post(fixture.url("/api/forms/no-such-token/submit"))
        .json(&json!({ "answers": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
