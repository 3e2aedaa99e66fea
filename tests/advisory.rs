#![allow(non_snake_case)]
use actix_web::{
    App,
    HttpRequest,
    HttpResponse,
    HttpServer,
    dev::ServerHandle,
    http::StatusCode,
    web,
};
use color_game_royale::{
    ColorCategory,
    advisory::{
        AdvisoryWorker,
        DangerLevel,
        GeminiOracle,
        OracleSlot,
        Prophecy,
        StaticOracle,
        consult,
    },
    test_helpers::{
        ScriptedAnswer,
        ScriptedOracle,
        advice_request,
        prophecy,
    },
};
use serde_json::json;
use std::{
    net::TcpListener,
    sync::{
        Arc,
        Mutex,
    },
    thread::JoinHandle,
    time::Duration,
};

#[derive(Clone, Debug)]
struct SeenRequest {
    path: String,
    api_key: Option<String>,
    body: String,
}

#[derive(Clone)]
struct Canned {
    status: StatusCode,
    body: String,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

/// A throwaway generateContent endpoint answering every request the same way.
struct FakeOracleServer {
    base_url: String,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    server_handle: ServerHandle,
    server_thread: Option<JoinHandle<()>>,
}

impl FakeOracleServer {
    fn start(status: u16, body: impl Into<String>) -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let canned = Canned {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.into(),
            seen: seen.clone(),
        };
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(canned.clone()))
                .default_service(web::to(answer))
        })
        .workers(1)
        .shutdown_timeout(1)
        .listen(listener)
        .unwrap()
        .run();
        let server_handle = server.handle();
        let server_thread = std::thread::spawn(move || {
            let sys = actix_web::rt::System::new();
            let _ = sys.block_on(server);
        });
        Self {
            base_url,
            seen,
            server_handle,
            server_thread: Some(server_thread),
        }
    }

    /// Wraps `text` the way generateContent returns it.
    fn answering_text(text: &str) -> Self {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        });
        Self::start(200, body.to_string())
    }

    fn oracle(&self) -> GeminiOracle {
        GeminiOracle::new(self.base_url.as_str(), "test-model", "secret").unwrap()
    }

    fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl Drop for FakeOracleServer {
    fn drop(&mut self) {
        let _ = self.server_handle.stop(true);
        if let Some(thread) = self.server_thread.take() {
            let _ = thread.join();
        }
    }
}

async fn answer(req: HttpRequest, body: web::Bytes, canned: web::Data<Canned>) -> HttpResponse {
    canned.seen.lock().unwrap().push(SeenRequest {
        path: req.path().to_string(),
        api_key: req
            .headers()
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: String::from_utf8_lossy(&body).into_owned(),
    });
    HttpResponse::build(canned.status)
        .content_type("application/json")
        .body(canned.body.clone())
}

#[tokio::test]
async fn consult__reads_a_full_prophecy() {
    // given
    let text = json!({
        "message": "Blue tides rise against the Umbra.",
        "rationale": "Water has been quiet for three rolls.",
        "recommendedColor": "blue",
        "dangerLevel": "High"
    })
    .to_string();
    let server = FakeOracleServer::answering_text(&text);
    let oracle = server.oracle();
    let mut request = advice_request(4);
    request.history = vec![ColorCategory::Red, ColorCategory::Green];

    // when
    let consultation = consult(&oracle, &request).await;

    // then
    assert!(!consultation.fell_back);
    assert_eq!(consultation.seq, 4);
    let prophecy = consultation.prophecy;
    assert_eq!(
        prophecy.message.as_deref(),
        Some("Blue tides rise against the Umbra.")
    );
    assert_eq!(prophecy.recommended_category(), Some(ColorCategory::Blue));
    assert_eq!(prophecy.danger_level, Some(DangerLevel::High));

    let seen = server.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path, "/v1beta/models/test-model:generateContent");
    assert_eq!(seen[0].api_key.as_deref(), Some("secret"));
    assert!(seen[0].body.contains("red, green"));
}

#[tokio::test]
async fn consult__falls_back_on_server_error() {
    // given
    let server = FakeOracleServer::start(500, r#"{"error":"overloaded"}"#);
    let oracle = server.oracle();

    // when
    let consultation = consult(&oracle, &advice_request(1)).await;

    // then
    assert!(consultation.fell_back);
    assert_eq!(consultation.prophecy, Prophecy::fallback());
}

#[tokio::test]
async fn consult__falls_back_on_malformed_answer() {
    // given
    let server = FakeOracleServer::answering_text("the oracle mumbles");
    let oracle = server.oracle();

    // when
    let consultation = consult(&oracle, &advice_request(1)).await;

    // then
    assert!(consultation.fell_back);
    assert_eq!(
        consultation.prophecy.message.as_deref(),
        Some("The mists are thick... Trust your instincts.")
    );
    assert_eq!(
        consultation.prophecy.rationale.as_deref(),
        Some("Connection to the Chromatic Kingdom is weak.")
    );
    assert_eq!(consultation.prophecy.recommended_category(), Some(ColorCategory::Red));
    assert_eq!(consultation.prophecy.danger_level, Some(DangerLevel::Medium));
}

#[tokio::test]
async fn consult__falls_back_on_an_envelope_that_is_not_json() {
    // given
    let server = FakeOracleServer::start(200, "<html>gateway</html>");
    let oracle = server.oracle();

    // when
    let consultation = consult(&oracle, &advice_request(1)).await;

    // then
    assert!(consultation.fell_back);
}

#[tokio::test]
async fn consult__keeps_what_a_partial_answer_provides() {
    // given
    let text = json!({ "message": "Embers stir.", "dangerLevel": "Apocalyptic", "rationale": 7 })
        .to_string();
    let server = FakeOracleServer::answering_text(&text);
    let oracle = server.oracle();

    // when
    let consultation = consult(&oracle, &advice_request(2)).await;

    // then
    assert!(!consultation.fell_back);
    assert_eq!(
        consultation.prophecy,
        Prophecy {
            message: Some("Embers stir.".to_string()),
            rationale: None,
            recommended_color: None,
            danger_level: None,
        }
    );
}

#[tokio::test]
async fn consult__reads_empty_text_as_an_empty_prophecy() {
    // given
    let server = FakeOracleServer::start(200, r#"{"candidates":[]}"#);
    let oracle = server.oracle();

    // when
    let consultation = consult(&oracle, &advice_request(3)).await;

    // then
    assert!(!consultation.fell_back);
    assert_eq!(consultation.prophecy, Prophecy::default());
}

#[tokio::test]
async fn consult__failing_oracle_falls_back() {
    // given
    let oracle = ScriptedOracle::always(ScriptedAnswer::Fail("quota exceeded".into()));

    // when
    let consultation = consult(&oracle, &advice_request(1)).await;

    // then
    assert!(consultation.fell_back);
    assert_eq!(consultation.prophecy, Prophecy::fallback());
}

#[tokio::test]
async fn consult__panicking_oracle_falls_back() {
    // given
    let oracle = ScriptedOracle::always(ScriptedAnswer::Panic);

    // when
    let consultation = consult(&oracle, &advice_request(1)).await;

    // then
    assert!(consultation.fell_back);
    assert_eq!(consultation.prophecy, Prophecy::fallback());
}

#[tokio::test]
async fn consult__static_oracle_answers_with_the_fallback_text() {
    // given
    let oracle = StaticOracle::default();

    // when
    let consultation = consult(&oracle, &advice_request(1)).await;

    // then
    assert!(!consultation.fell_back);
    assert_eq!(consultation.prophecy, Prophecy::fallback());
}

#[tokio::test]
async fn advisory_worker__last_answer_to_arrive_wins() {
    // given
    let oracle = ScriptedOracle::always(ScriptedAnswer::Fail("unused".into()))
        .on(
            1,
            Duration::from_millis(150),
            ScriptedAnswer::Prophecy(prophecy("slow and stale", "green")),
        )
        .on(
            2,
            Duration::ZERO,
            ScriptedAnswer::Prophecy(prophecy("quick and fresh", "yellow")),
        );
    let (worker, mut answers) = AdvisoryWorker::new(Arc::new(oracle));
    let mut slot = OracleSlot::default();

    // when
    for seq in [1, 2] {
        slot.requested();
        worker.request(advice_request(seq));
    }
    let first = answers.recv().await.unwrap();
    slot.received(first.clone());
    assert!(slot.is_thinking());
    let second = answers.recv().await.unwrap();
    slot.received(second);

    // then
    assert_eq!(first.seq, 2);
    assert!(!slot.is_thinking());
    let shown = slot.latest().unwrap();
    assert_eq!(shown.seq, 1);
    assert_eq!(shown.prophecy.message.as_deref(), Some("slow and stale"));
}
