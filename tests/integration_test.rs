use async_trait::async_trait;
use question_authoring::error::{AppError, AppResult, EditorError};
use question_authoring::infrastructure::{
    ApiRequest, ApiResponse, HttpMethod, RequestExecutor, StaticCredentials,
};
use question_authoring::models::QuestionRecord;
use question_authoring::services::{augment_names, reshape, to_view_model, to_wire_format};
use question_authoring::workflow::editor::{EditorHost, EditorState};
use question_authoring::workflow::Affordance;
use question_authoring::{
    AuthoringSession, Config, FormMode, ImportHost, PermissionMap, QuestionType,
    SubmitOutcome, TaxonomyKind, Validator,
};
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};

// ========== 脚本化的请求执行器 ==========

type Handler = Box<dyn Fn(&ApiRequest) -> AppResult<ApiResponse> + Send + Sync>;

struct ScriptedExecutor {
    handler: Handler,
    log: Mutex<Vec<ApiRequest>>,
}

impl ScriptedExecutor {
    fn new(handler: impl Fn(&ApiRequest) -> AppResult<ApiResponse> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            log: Mutex::new(Vec::new()),
        })
    }

    fn requests_to(&self, method: HttpMethod, url: &str) -> Vec<ApiRequest> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RequestExecutor for ScriptedExecutor {
    async fn execute(&self, request: ApiRequest) -> AppResult<ApiResponse> {
        self.log.lock().unwrap().push(request.clone());
        (self.handler)(&request)
    }
}

/// 下拉框数据；其余请求交给 `questions`
fn with_taxonomy(
    questions: impl Fn(&ApiRequest) -> AppResult<ApiResponse> + Send + Sync + 'static,
) -> impl Fn(&ApiRequest) -> AppResult<ApiResponse> + Send + Sync + 'static {
    move |request| {
        if request.method != HttpMethod::Get {
            return questions(request);
        }
        let data = match request.url.as_str() {
            "/api/organizations/" => json!([{"id": 1, "name": "Education Board"}]),
            "/api/question-levels/" => json!([{"id": 2, "name": "SSC"}]),
            "/api/target-groups/" => json!([{"id": 3, "name": "Science"}]),
            "/api/subjects/" => json!([{"id": 4, "name": "Physics"}]),
            "/api/topics/" => json!([{"id": 5, "name": "Optics"}, {"id": 6, "name": "Mechanics"}]),
            "/api/subtopics/" => match request.query_value("topic") {
                Some("5") => json!([
                    {"id": 50, "name": "Lenses", "topic": 5},
                    {"id": 51, "name": "Mirrors", "topic": 5}
                ]),
                Some("6") => json!([{"id": 60, "name": "Kinematics", "topic": 6}]),
                Some(_) => json!([]),
                None => json!([
                    {"id": 50, "name": "Lenses", "topic": 5},
                    {"id": 51, "name": "Mirrors", "topic": 5},
                    {"id": 60, "name": "Kinematics", "topic": 6}
                ]),
            },
            "/api/subsubtopics/" => match request.query_value("sub_topic") {
                Some("50") => json!([{"id": 500, "name": "Convex", "sub_topic": 50}]),
                _ => json!([]),
            },
            "/api/exam-references/" => json!([{"id": 7, "reference_name": "HSC 2020"}]),
            "/api/difficulty-levels/" => json!([{"id": 8, "name": "Easy"}]),
            "/api/countries/" => json!({"results": [
                {"id": 1, "country_name": "X"},
                {"id": 2, "country_name": "Y"}
            ]}),
            "/api/geo-admin-1/" => match request.query_value("country") {
                Some("1") => json!([
                    {"id": 11, "name": "S1"}, {"id": 12, "name": "S2"}, {"id": 13, "name": "S3"},
                    {"id": 14, "name": "S4"}, {"id": 15, "name": "S5"}
                ]),
                Some("2") => json!([{"id": 21, "name": "T1"}, {"id": 22, "name": "T2"}]),
                _ => json!([]),
            },
            _ => return questions(request),
        };
        Ok(ApiResponse::ok(200, data))
    }
}

fn not_found(_: &ApiRequest) -> AppResult<ApiResponse> {
    Ok(ApiResponse::failed(404, "Not found", None))
}

fn created(request: &ApiRequest) -> AppResult<ApiResponse> {
    let mut data = match &request.data {
        question_authoring::infrastructure::RequestBody::Json(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    data.insert("id".to_string(), json!(99));
    Ok(ApiResponse::ok(201, Value::Object(data)))
}

async fn session_with(
    handler: impl Fn(&ApiRequest) -> AppResult<ApiResponse> + Send + Sync + 'static,
) -> (AuthoringSession, Arc<ScriptedExecutor>) {
    let executor = ScriptedExecutor::new(with_taxonomy(handler));
    let mut session = AuthoringSession::new(
        &Config::default(),
        executor.clone(),
        Arc::new(StaticCredentials::new(Some("secret".to_string()))),
    );
    session.init().await.unwrap();
    (session, executor)
}

/// 记录所有回调
#[derive(Default)]
struct RecordingHost {
    events: Mutex<Vec<String>>,
}

impl RecordingHost {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl EditorHost for RecordingHost {
    fn on_submit(&self, message: &str, success: bool) {
        self.push(format!("submit:{}:{}", success, message));
    }

    fn on_cancel(&self) {
        self.push("cancel".to_string());
    }

    fn add_row(&self, record: &QuestionRecord) {
        self.push(format!("add:{:?}", record.id));
    }

    fn delete_row(&self, id: i64) {
        self.push(format!("delete:{}", id));
    }
}

impl ImportHost for RecordingHost {
    fn reload_list(&self) {
        self.push("reload".to_string());
    }
}

// ========== 题目数据 ==========

fn base_details() -> Map<String, Value> {
    let Value::Object(map) = json!({
        "target_organization": 1,
        "question_level": 2,
        "target_group": 3,
        "target_subject": 4,
        "topic": 5
    }) else {
        unreachable!()
    };
    map
}

/// 每种题型最小的合法详情，以及该题型特有的必填字段
fn minimal_details(question_type: QuestionType) -> (Map<String, Value>, &'static str) {
    let (extra, required) = match question_type {
        QuestionType::McqSingle => (
            json!({"question_text": "Pick one", "options": ["a", "b"], "correct_answer": 0}),
            "correct_answer",
        ),
        QuestionType::McqMulti => (
            json!({"question_text": "Pick some", "options": ["a", "b"], "correct_answer": [0, 1]}),
            "correct_answer",
        ),
        QuestionType::TrueFalse => (
            json!({"question_text": "Light is a wave", "correct_answer": "True"}),
            "correct_answer",
        ),
        QuestionType::Numerical => (
            json!({"question_text": "2 + 2", "correct_answer": 4}),
            "correct_answer",
        ),
        QuestionType::Ordering => (
            json!({"question_text": "Order these", "ordering_sequence": ["a", "b"]}),
            "ordering_sequence",
        ),
        QuestionType::Matching => (
            json!({"options_column_a": ["a"], "options_column_b": ["x"], "correct_answer": "[1, 1]"}),
            "options_column_a",
        ),
        QuestionType::Diagram => (json!({"diagram_url": "https://cdn/d.png"}), "diagram_url"),
        QuestionType::Image => (json!({"image_url": "https://cdn/i.png"}), "image_url"),
        QuestionType::AudioVideo => (json!({"audio_url": "https://cdn/a.mp3"}), "audio_url"),
        QuestionType::FillBlank
        | QuestionType::Descriptive
        | QuestionType::Code
        | QuestionType::AssertionReason
        | QuestionType::CaseStudy => (json!({"question_text": "Explain"}), "question_text"),
    };

    let mut details = base_details();
    if let Value::Object(extra) = extra {
        details.extend(extra);
    }
    details.insert(
        "explanations".to_string(),
        json!([{"level": "Preliminary", "text": "because"}]),
    );
    (details, required)
}

fn record(question_type: QuestionType, details: Map<String, Value>) -> QuestionRecord {
    QuestionRecord {
        id: Some(7),
        question_type: question_type.code().to_string(),
        details,
    }
}

fn candidate(question_type: &str, text: &str) -> Value {
    let mut item = base_details();
    item.insert("question_type".to_string(), json!(question_type));
    item.insert("question_text".to_string(), json!(text));
    Value::Object(item)
}

// ========== 题型与校验 ==========

#[test]
fn minimal_record_of_every_type_validates_and_losing_its_field_does_not() {
    let validator = Validator::default();
    for question_type in QuestionType::ALL {
        let (details, required) = minimal_details(question_type);
        let form = to_view_model(&record(question_type, details.clone())).unwrap();
        let report = validator.validate_form(&form);
        assert!(report.is_valid(), "{}: {:?}", question_type, report);

        let mut broken = details;
        broken.remove(required);
        let form = to_view_model(&record(question_type, broken)).unwrap();
        let report = validator.validate_form(&form);
        assert!(report.has(required), "{} 缺少 {} 仍通过校验", question_type, required);
    }
}

#[test]
fn minimal_record_of_every_type_round_trips() {
    for question_type in QuestionType::ALL {
        let (details, _) = minimal_details(question_type);
        let r = record(question_type, details.clone());
        let wire = to_wire_format(&to_view_model(&r).unwrap()).unwrap();
        assert_eq!(wire.question_type, question_type);
        assert_eq!(wire.body, details, "{}", question_type);
    }
}

// ========== 级联下拉框 ==========

#[tokio::test]
async fn topic_cascade_filters_and_clears_lower_levels() {
    let (session, executor) = session_with(not_found).await;
    let host = Arc::new(RecordingHost::default());
    let mut editor = session.open_editor(FormMode::Create, None, host).unwrap();

    editor.select_taxonomy(TaxonomyKind::Topic, Some(5)).await.unwrap();
    let sub_topics = editor.options_for(TaxonomyKind::SubTopic);
    assert_eq!(sub_topics.len(), 2);
    assert!(sub_topics.iter().all(|n| n.parent_id == Some(5)));

    editor.select_taxonomy(TaxonomyKind::SubTopic, Some(50)).await.unwrap();
    editor.set_taxonomy_ids(TaxonomyKind::SubSubTopic, vec![500]).unwrap();
    assert_eq!(editor.form().sub_sub_topic, vec![500]);

    editor.select_taxonomy(TaxonomyKind::Topic, Some(6)).await.unwrap();
    assert_eq!(editor.form().topic, Some(6));
    assert_eq!(editor.form().sub_topic, None);
    assert!(editor.form().sub_sub_topic.is_empty());
    assert_eq!(editor.resolver().selection(TaxonomyKind::SubTopic), None);
    assert_eq!(editor.resolver().selection(TaxonomyKind::SubSubTopic), None);

    let labels: Vec<_> = editor
        .options_for(TaxonomyKind::SubTopic)
        .iter()
        .map(|n| n.label.clone())
        .collect();
    assert_eq!(labels, vec!["Kinematics"]);

    let fetches = executor.requests_to(HttpMethod::Get, "/api/subtopics/");
    assert_eq!(fetches.last().unwrap().query_value("topic"), Some("6"));
    assert_eq!(fetches.last().unwrap().token.as_deref(), Some("secret"));
}

#[tokio::test]
async fn changing_country_clears_state_and_repopulates_it() {
    let (mut session, _) = session_with(not_found).await;
    let taxonomy = session.taxonomy().clone();
    let resolver = session.resolver_mut();

    let fetch = resolver.select(TaxonomyKind::Country, Some(1)).unwrap().unwrap();
    resolver.load(&taxonomy, fetch).await.unwrap();
    assert_eq!(resolver.options_for(TaxonomyKind::State).len(), 5);

    resolver.select(TaxonomyKind::State, Some(11)).unwrap();
    assert_eq!(resolver.selection(TaxonomyKind::State), Some(11));

    let fetch = resolver.select(TaxonomyKind::Country, Some(2)).unwrap().unwrap();
    assert_eq!(resolver.selection(TaxonomyKind::State), None);
    resolver.load(&taxonomy, fetch).await.unwrap();

    let states: Vec<_> = resolver
        .options_for(TaxonomyKind::State)
        .iter()
        .map(|n| n.label.clone())
        .collect();
    assert_eq!(states, vec!["T1", "T2"]);
}

#[tokio::test]
async fn failed_dropdown_kind_becomes_an_empty_list() {
    let (session, _) = session_with(not_found).await;
    assert!(session.is_initialized());
    assert!(session.resolver().list(TaxonomyKind::QuestionStatus).is_empty());
    assert_eq!(session.resolver().list(TaxonomyKind::Topic).len(), 2);
    assert_eq!(session.resolver().label_of(TaxonomyKind::Country, 2), Some("Y"));
}

// ========== 单题编辑器 ==========

async fn fill_base(editor: &mut question_authoring::QuestionEditor) {
    for (kind, id) in [
        (TaxonomyKind::Organization, 1),
        (TaxonomyKind::QuestionLevel, 2),
        (TaxonomyKind::TargetGroup, 3),
        (TaxonomyKind::Subject, 4),
        (TaxonomyKind::Topic, 5),
    ] {
        editor.select_taxonomy(kind, Some(id)).await.unwrap();
    }
}

#[tokio::test]
async fn mcq_multi_option_removal_reindexes_the_answer() {
    let (session, _) = session_with(not_found).await;
    let mut editor = session
        .open_editor(FormMode::Create, None, Arc::new(RecordingHost::default()))
        .unwrap();
    assert_eq!(editor.state(), EditorState::Empty);

    editor.set_question_type(Some(QuestionType::McqMulti)).unwrap();
    assert_eq!(editor.state(), EditorState::Editing);
    assert_eq!(editor.form().options.len(), 2);
    editor.add_option().unwrap();
    editor.add_option().unwrap();

    editor.toggle_correct_option(0).unwrap();
    editor.toggle_correct_option(2).unwrap();
    editor.remove_option(1).unwrap();

    assert_eq!(editor.form().options.len(), 3);
    assert_eq!(editor.form().correct_answer, json!([0, 1]));
}

#[tokio::test]
async fn create_submits_wire_payload_and_adds_the_row() {
    let (session, executor) = session_with(created).await;
    let host = Arc::new(RecordingHost::default());
    let mut editor = session
        .open_editor(FormMode::Create, None, host.clone())
        .unwrap();

    fill_base(&mut editor).await;
    editor.set_question_type(Some(QuestionType::McqSingle)).unwrap();
    editor.set_question_text("Which lens converges light?").unwrap();
    editor.set_option_text(0, "Concave").unwrap();
    editor.set_option_text(1, "Convex").unwrap();
    editor.toggle_correct_option(1).unwrap();
    editor.add_explanation().unwrap();
    editor.set_explanation_text(0, "Convex lenses converge").unwrap();

    let outcome = editor.submit().await.unwrap();
    let SubmitOutcome::Saved(saved) = outcome else {
        panic!("提交应当成功: {:?}", outcome);
    };
    assert_eq!(saved.id, Some(99));
    assert_eq!(editor.state(), EditorState::Submitted);

    let posts = executor.requests_to(HttpMethod::Post, "/api/questions/");
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].query_value("type"), Some("MCQ_SINGLE"));
    let question_authoring::infrastructure::RequestBody::Json(body) = &posts[0].data else {
        panic!("应当是 JSON 请求体");
    };
    assert_eq!(body["options"], json!(["Concave", "Convex"]));
    assert_eq!(body["explanations"][0]["level"], json!("Preliminary"));
    assert!(body.get("question_type").is_none());

    assert_eq!(
        host.events(),
        vec!["add:Some(99)", "submit:true:Question created successfully"]
    );
}

#[tokio::test]
async fn invalid_form_is_reported_without_a_request() {
    let (session, executor) = session_with(created).await;
    let mut editor = session
        .open_editor(FormMode::Create, None, Arc::new(RecordingHost::default()))
        .unwrap();
    editor.set_question_type(Some(QuestionType::Numerical)).unwrap();

    let outcome = editor.submit().await.unwrap();
    let SubmitOutcome::Invalid(report) = outcome else {
        panic!("应当校验失败");
    };
    assert_eq!(report.first("topic"), Some("Topic is required"));
    assert!(report.has("question_text"));
    assert!(executor.requests_to(HttpMethod::Post, "/api/questions/").is_empty());

    // 第一次提交失败后，修改会立即重新校验
    editor.set_question_text("2 + 2").unwrap();
    assert!(!editor.errors().has("question_text"));
    assert!(editor.errors().has("topic"));
}

#[tokio::test]
async fn server_rejection_maps_field_errors_and_global_message() {
    let (session, _) = session_with(|_| {
        Ok(ApiResponse::failed(
            400,
            "Server error",
            Some(json!({"question_text": ["Too short"]})),
        ))
    })
    .await;
    let host = Arc::new(RecordingHost::default());
    let mut editor = session
        .open_editor(FormMode::Create, None, host.clone())
        .unwrap();
    fill_base(&mut editor).await;
    editor.set_question_type(Some(QuestionType::Descriptive)).unwrap();
    editor.set_question_text("Why?").unwrap();

    let outcome = editor.submit().await.unwrap();
    assert_eq!(
        outcome,
        SubmitOutcome::Rejected {
            message: "question_text: Too short".to_string()
        }
    );
    assert_eq!(editor.state(), EditorState::Editing);
    assert_eq!(editor.errors().first("question_text"), Some("Too short"));
    assert_eq!(editor.global_error(), Some("question_text: Too short"));
    assert_eq!(host.events(), vec!["submit:false:question_text: Too short"]);
}

#[tokio::test]
async fn transport_failure_surfaces_the_generic_message() {
    let (session, _) = session_with(|request| {
        Err(AppError::Other(format!("connection reset: {}", request.url)))
    })
    .await;
    let (details, _) = minimal_details(QuestionType::Code);
    let mut editor = session
        .open_editor(
            FormMode::Edit,
            Some(&record(QuestionType::Code, details)),
            Arc::new(RecordingHost::default()),
        )
        .unwrap();

    let outcome = editor.submit().await.unwrap();
    assert_eq!(
        outcome,
        SubmitOutcome::Rejected {
            message: "An error occurred while submitting the form.".to_string()
        }
    );
}

#[tokio::test]
async fn edit_updates_in_place_and_replaces_the_row() {
    let (session, executor) = session_with(created).await;
    let host = Arc::new(RecordingHost::default());
    let (details, _) = minimal_details(QuestionType::TrueFalse);
    let mut editor = session
        .open_editor(FormMode::Edit, Some(&record(QuestionType::TrueFalse, details)), host.clone())
        .unwrap();
    assert_eq!(editor.state(), EditorState::Editing);
    assert_eq!(editor.resolver().selection(TaxonomyKind::Topic), Some(5));

    editor.set_correct_answer(json!("Not-given")).unwrap();
    let outcome = editor.submit().await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Saved(_)));

    let puts = executor.requests_to(HttpMethod::Put, "/api/questions/7/");
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].query_value("type"), Some("TRUE_FALSE"));
    assert_eq!(
        host.events(),
        vec!["delete:7", "add:Some(99)", "submit:true:Question updated successfully"]
    );
}

#[tokio::test]
async fn clone_drops_the_id_and_submits_as_create() {
    let (session, executor) = session_with(created).await;
    let (details, _) = minimal_details(QuestionType::Ordering);
    let mut editor = session
        .open_editor(
            FormMode::Clone,
            Some(&record(QuestionType::Ordering, details)),
            Arc::new(RecordingHost::default()),
        )
        .unwrap();
    assert_eq!(editor.id(), None);

    editor.set_ordering_text("first, second , ,third").unwrap();
    assert_eq!(editor.form().ordering_sequence, vec!["first", "second", "third"]);
    editor.submit().await.unwrap();

    assert_eq!(executor.requests_to(HttpMethod::Post, "/api/questions/").len(), 1);
    assert!(executor.requests_to(HttpMethod::Put, "/api/questions/7/").is_empty());
}

#[tokio::test]
async fn view_mode_rejects_every_mutation() {
    let (session, executor) = session_with(created).await;
    let (details, _) = minimal_details(QuestionType::McqSingle);
    let mut editor = session
        .open_editor(
            FormMode::View,
            Some(&record(QuestionType::McqSingle, details)),
            Arc::new(RecordingHost::default()),
        )
        .unwrap();

    assert!(editor.is_read_only());
    assert_eq!(editor.set_question_text("x"), Err(EditorError::ReadOnly));
    assert_eq!(editor.add_option(), Err(EditorError::ReadOnly));
    assert!(editor.select_taxonomy(TaxonomyKind::Topic, Some(6)).await.is_err());
    assert!(editor.submit().await.is_err());
    assert!(executor.requests_to(HttpMethod::Post, "/api/questions/").is_empty());
}

#[tokio::test]
async fn switching_type_keeps_entered_values() {
    let (session, _) = session_with(not_found).await;
    let host = Arc::new(RecordingHost::default());
    let mut editor = session.open_editor(FormMode::Create, None, host.clone()).unwrap();

    editor.set_question_type(Some(QuestionType::McqSingle)).unwrap();
    editor.set_option_text(0, "kept").unwrap();
    editor.set_question_type(Some(QuestionType::Numerical)).unwrap();
    assert!(!editor.visible_fields().contains(&"options"));
    editor.set_question_type(Some(QuestionType::McqSingle)).unwrap();
    assert_eq!(editor.form().options[0].option_text, "kept");

    assert!(editor.set_question_type_code("DRAG_DROP").unwrap_err().is_fatal());

    editor.reset_form();
    assert_eq!(editor.state(), EditorState::Empty);
    assert!(editor.form().options.is_empty());

    editor.cancel().unwrap();
    assert_eq!(editor.state(), EditorState::Discarded);
    assert_eq!(host.events(), vec!["cancel"]);
    assert!(editor.set_question_text("late").is_err());
}

#[tokio::test]
async fn clone_strips_nested_ids_from_the_create_body() {
    let (session, executor) = session_with(created).await;
    let source = QuestionRecord::from_api(json!({
        "id": 31,
        "question_type": "CODE",
        "details": {
            "id": 31,
            "target_organization": 1, "question_level": 2, "target_group": 3,
            "target_subject": 4, "topic": 5,
            "question_text": "fn main() {}",
            "explanations": [{"id": 900, "level": "Preliminary", "text": "entry point"}]
        }
    }))
    .unwrap();

    let mut editor = session
        .open_editor(FormMode::Clone, Some(&source), Arc::new(RecordingHost::default()))
        .unwrap();
    assert_eq!(editor.id(), None);
    let outcome = editor.submit().await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Saved(_)), "{:?}", outcome);

    let posts = executor.requests_to(HttpMethod::Post, "/api/questions/");
    assert_eq!(posts.len(), 1);
    let question_authoring::infrastructure::RequestBody::Json(body) = &posts[0].data else {
        panic!("应当是 JSON 请求体");
    };
    assert!(body.get("id").is_none());
    assert!(body["explanations"][0].get("id").is_none());
    assert_eq!(body["explanations"][0]["text"], json!("entry point"));
    assert!(executor.requests_to(HttpMethod::Put, "/api/questions/31/").is_empty());
}

#[tokio::test]
async fn failed_validation_leaves_the_editor_editable() {
    let (session, executor) = session_with(created).await;
    let mut editor = session
        .open_editor(FormMode::Create, None, Arc::new(RecordingHost::default()))
        .unwrap();
    fill_base(&mut editor).await;
    editor.set_question_text("Explain refraction").unwrap();

    // 没有题型时无法整理提交载荷，也不应卡在 Submitting
    let outcome = editor.submit().await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Invalid(_)));
    assert_eq!(editor.state(), EditorState::Editing);

    editor.set_question_type(Some(QuestionType::Descriptive)).unwrap();
    let outcome = editor.submit().await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Saved(_)), "{:?}", outcome);
    assert_eq!(editor.state(), EditorState::Submitted);
    assert_eq!(executor.requests_to(HttpMethod::Post, "/api/questions/").len(), 1);
}

// ========== 内联新建分类 ==========

fn taxonomy_writes(request: &ApiRequest) -> AppResult<ApiResponse> {
    match (request.method, request.url.as_str()) {
        (HttpMethod::Post, "/api/subtopics/") => Ok(ApiResponse::ok(201, json!({"id": 52, "name": "Prisms"}))),
        (HttpMethod::Post, "/api/topics/") => Ok(ApiResponse::failed(
            400,
            "topic with this name already exists.",
            Some(json!({"name": ["topic with this name already exists."]})),
        )),
        (HttpMethod::Post, "/api/exam-references/") => {
            Ok(ApiResponse::ok(201, json!({"id": 70, "reference_name": "HSC 2021"})))
        }
        _ => not_found(request),
    }
}

#[tokio::test]
async fn inline_created_entry_is_appended_without_refetch() {
    let (session, executor) = session_with(taxonomy_writes).await;
    let mut editor = session
        .open_editor(FormMode::Create, None, Arc::new(RecordingHost::default()))
        .unwrap();
    editor.select_taxonomy(TaxonomyKind::Topic, Some(5)).await.unwrap();
    let fetches = executor.requests_to(HttpMethod::Get, "/api/subtopics/").len();

    let node = editor
        .create_taxonomy_entry(TaxonomyKind::SubTopic, "Prisms")
        .await
        .unwrap();
    assert_eq!(node.id, 52);
    assert_eq!(node.parent_id, Some(5));

    let posts = executor.requests_to(HttpMethod::Post, "/api/subtopics/");
    assert_eq!(posts.len(), 1);
    let question_authoring::infrastructure::RequestBody::Json(body) = &posts[0].data else {
        panic!("应当是 JSON 请求体");
    };
    assert_eq!(body, &json!({"name": "Prisms", "topic": 5}));

    let labels: Vec<_> = editor
        .options_for(TaxonomyKind::SubTopic)
        .into_iter()
        .map(|n| n.label.clone())
        .collect();
    assert_eq!(labels, vec!["Lenses", "Mirrors", "Prisms"]);
    assert_eq!(executor.requests_to(HttpMethod::Get, "/api/subtopics/").len(), fetches);
    assert_eq!(editor.global_error(), None);
}

#[tokio::test]
async fn rejected_duplicate_entry_sets_the_global_error() {
    let (session, _) = session_with(taxonomy_writes).await;
    let mut editor = session
        .open_editor(FormMode::Create, None, Arc::new(RecordingHost::default()))
        .unwrap();

    let err = editor
        .create_taxonomy_entry(TaxonomyKind::Topic, "Optics")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Api(_)));
    assert!(editor.global_error().unwrap().contains("already exists"));
    assert_eq!(editor.options_for(TaxonomyKind::Topic).len(), 2);
}

#[tokio::test]
async fn entry_created_through_the_session_reaches_later_editors() {
    let (mut session, _) = session_with(taxonomy_writes).await;
    let mut editor = session
        .open_editor(FormMode::Create, None, Arc::new(RecordingHost::default()))
        .unwrap();

    session
        .create_taxonomy_entry(&mut editor, TaxonomyKind::ExamReference, "HSC 2021")
        .await
        .unwrap();
    assert_eq!(session.resolver().label_of(TaxonomyKind::ExamReference, 70), Some("HSC 2021"));

    let mut later = session
        .open_editor(FormMode::Create, None, Arc::new(RecordingHost::default()))
        .unwrap();
    assert_eq!(later.options_for(TaxonomyKind::ExamReference).len(), 2);
    later.set_taxonomy_ids(TaxonomyKind::ExamReference, vec![7, 70]).unwrap();
    assert_eq!(later.form().exam_references, vec![7, 70]);
}

// ========== 媒体上传 ==========

fn uploads(request: &ApiRequest) -> AppResult<ApiResponse> {
    match (request.method, request.query_value("filename")) {
        (HttpMethod::Put, Some("broken.png")) => Ok(ApiResponse::ok(200, json!({"status": "stored"}))),
        (HttpMethod::Put, Some(name)) => Ok(ApiResponse::ok(
            200,
            json!({"media_link": format!("https://cdn/{}", name)}),
        )),
        _ => not_found(request),
    }
}

#[tokio::test]
async fn uploaded_media_fills_the_type_media_field() {
    let (session, executor) = session_with(uploads).await;
    let mut editor = session
        .open_editor(FormMode::Create, None, Arc::new(RecordingHost::default()))
        .unwrap();

    // 没有题型时不知道写入哪个字段
    assert!(editor.upload_media("d.png", "image/png", vec![1]).await.is_err());

    editor.set_question_type(Some(QuestionType::Diagram)).unwrap();
    let url = editor
        .upload_media("d.png", "image/png", vec![1, 2, 3])
        .await
        .unwrap();
    assert_eq!(url, "https://cdn/d.png");
    assert_eq!(editor.form().media_url("diagram_url"), Some("https://cdn/d.png"));

    let puts = executor.requests_to(HttpMethod::Put, "/api/upload/");
    assert_eq!(puts.len(), 1);
    assert_eq!(
        puts[0].data,
        question_authoring::infrastructure::RequestBody::Bytes {
            content_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        }
    );

    editor.add_explanation().unwrap();
    let video = editor
        .upload_explanation_video(0, "why.mp4", "video/mp4", vec![9])
        .await
        .unwrap();
    assert_eq!(video, "https://cdn/why.mp4");
    assert_eq!(editor.form().explanations[0].video_url.as_deref(), Some("https://cdn/why.mp4"));
    assert_eq!(editor.form().explanations[0].filename.as_deref(), Some("why.mp4"));
    assert!(editor
        .upload_explanation_video(3, "x.mp4", "video/mp4", vec![])
        .await
        .is_err());
}

#[tokio::test]
async fn upload_without_media_link_is_an_error() {
    let (session, _) = session_with(uploads).await;
    let mut editor = session
        .open_editor(FormMode::Create, None, Arc::new(RecordingHost::default()))
        .unwrap();
    editor.set_question_type(Some(QuestionType::Image)).unwrap();

    let err = editor
        .upload_media("broken.png", "image/png", vec![1])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Api(_)));
    assert!(editor.global_error().is_some());
    assert_eq!(editor.form().media_url("image_url"), None);
}

#[tokio::test]
async fn upload_without_a_token_never_reaches_the_server() {
    let executor = ScriptedExecutor::new(with_taxonomy(uploads));
    let mut session = AuthoringSession::new(
        &Config::default(),
        executor.clone(),
        Arc::new(StaticCredentials::new(None)),
    );
    session.init().await.unwrap();
    let mut editor = session
        .open_editor(FormMode::Create, None, Arc::new(RecordingHost::default()))
        .unwrap();
    editor.set_question_type(Some(QuestionType::AudioVideo)).unwrap();

    let err = editor
        .upload_media("a.mp3", "audio/mpeg", vec![1])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Api(question_authoring::error::ApiError::MissingCredential { .. })
    ));
    assert!(editor.global_error().is_some());
    assert!(executor.requests_to(HttpMethod::Put, "/api/upload/").is_empty());
}

// ========== 题目列表 ==========

#[tokio::test]
async fn list_pages_and_gates_affordances() {
    let (session, executor) = session_with(|request| match request.method {
        HttpMethod::Get => Ok(ApiResponse::ok(
            200,
            json!({"count": 45, "results": [
                {"id": 31, "question_type": "CODE", "question_text": "fn main", "topic": 5},
                {"id": 32, "question_type": "NUMERICAL", "question_text": "1 + 1", "topic": 5}
            ]}),
        )),
        HttpMethod::Delete => Ok(ApiResponse::ok(204, Value::Null)),
        _ => not_found(request),
    })
    .await;

    let permissions = PermissionMap::default()
        .grant(Affordance::View)
        .grant(Affordance::Delete);
    let mut list = session.list(None, permissions);
    list.search(&session, " lens ").await.unwrap();
    list.goto_page(&session, 2).await.unwrap();

    assert_eq!(list.total(), 45);
    assert_eq!(list.page_count(), 3);
    assert_eq!(list.rows().len(), 2);
    let gets = executor.requests_to(HttpMethod::Get, "/api/questions/");
    let last = gets.last().unwrap();
    assert_eq!(last.query_value("offset"), Some("40"));
    assert_eq!(last.query_value("search"), Some("lens"));

    let err = list.open_editor(&session, FormMode::Clone, Some(0)).err().unwrap();
    assert!(matches!(
        err,
        AppError::Editor(EditorError::PermissionDenied { .. })
    ));
    let viewer = list.open_editor(&session, FormMode::View, Some(1)).unwrap();
    assert_eq!(viewer.id(), Some(32));

    list.delete(&session, 0).await.unwrap();
    assert_eq!(list.rows().len(), 1);
    assert_eq!(list.total(), 44);
    assert_eq!(
        executor.requests_to(HttpMethod::Delete, "/api/questions/31/")[0].query_value("type"),
        Some("CODE")
    );
    assert_eq!(
        list.host().last_message(),
        Some(("Question deleted successfully".to_string(), true))
    );
}

#[tokio::test]
async fn list_page_size_comes_from_config() {
    let executor = ScriptedExecutor::new(with_taxonomy(|request| match request.method {
        HttpMethod::Get => Ok(ApiResponse::ok(200, json!({"count": 30, "results": []}))),
        _ => not_found(request),
    }));
    let config = Config {
        items_per_page: 15,
        ..Config::default()
    };
    let mut session = AuthoringSession::new(
        &config,
        executor.clone(),
        Arc::new(StaticCredentials::new(Some("secret".to_string()))),
    );
    session.init().await.unwrap();

    let mut list = session.list(Some(QuestionType::Numerical), PermissionMap::all());
    list.goto_page(&session, 1).await.unwrap();
    assert_eq!(list.page_count(), 2);
    let gets = executor.requests_to(HttpMethod::Get, "/api/questions/");
    let last = gets.last().unwrap();
    assert_eq!(last.query_value("limit"), Some("15"));
    assert_eq!(last.query_value("offset"), Some("15"));
    assert_eq!(last.query_value("type"), Some("NUMERICAL"));
}

// ========== 批量导入 ==========

#[tokio::test]
async fn two_item_import_empties_pending_and_reloads() {
    let (session, executor) = session_with(created).await;
    let host = Arc::new(RecordingHost::default());
    let mut importer = session.importer(host.clone());

    let document = json!([
        {
            "id": 101, "question_type": "MCQ_SINGLE", "target_organization": 1,
            "question_level": 2, "target_group": 3, "target_subject": 4, "topic": 5,
            "question_text": "Which?", "options": ["a", "b", "c"], "correct_answer": 1
        },
        {
            "id": 102, "question_type": "ORDERING", "target_organization": 1,
            "question_level": 2, "target_group": 3, "target_subject": 4, "topic": 5,
            "question_text": "Order", "ordering_sequence": ["w", "x", "y", "z"]
        }
    ]);
    assert_eq!(importer.load_str(&document.to_string()).unwrap(), 2);

    let report = importer.import_all().await.unwrap();
    assert_eq!(report.succeeded, vec![0, 1]);
    assert!(report.failed.is_empty());
    assert!(report.error.is_none());
    assert!(report.reloaded);
    assert_eq!(importer.pending_len(), 0);
    assert_eq!(host.events(), vec!["reload"]);

    let posts = executor.requests_to(HttpMethod::Post, "/api/questions/");
    let mut types: Vec<_> = posts
        .iter()
        .filter_map(|r| r.query_value("type").map(str::to_string))
        .collect();
    types.sort();
    assert_eq!(types, vec!["MCQ_SINGLE", "ORDERING"]);
}

#[tokio::test]
async fn reconciliation_keeps_failures_and_reports_the_lowest() {
    let (session, _) = session_with(|request| {
        let text = match &request.data {
            question_authoring::infrastructure::RequestBody::Json(body) => {
                body["question_text"].as_str().unwrap_or_default().to_string()
            }
            _ => String::new(),
        };
        match text.as_str() {
            "q1" => Ok(ApiResponse::failed(
                400,
                "Bad Request",
                Some(json!({
                    "question_text": [],
                    "explanations": [{"text": ["This field may not be blank."]}]
                })),
            )),
            "q3" => Ok(ApiResponse::failed(400, "Bad Request", Some(json!({"topic": ["Invalid pk"]})))),
            _ => created(request),
        }
    })
    .await;
    let host = Arc::new(RecordingHost::default());
    let mut importer = session.importer(host.clone());

    let document = Value::Array(
        (0..4)
            .map(|i| candidate("DESCRIPTIVE", &format!("q{}", i)))
            .collect(),
    );
    importer.load_str(&document.to_string()).unwrap();

    let report = importer.import_all().await.unwrap();
    assert_eq!(report.succeeded, vec![0, 2]);
    assert_eq!(report.failed, vec![1, 3]);
    assert_eq!(
        report.error.as_deref(),
        Some("Error in Question 2: explanations -> text: This field may not be blank.")
    );
    assert_eq!(report.error_leaf.as_ref().unwrap().path, "explanations -> text");
    assert!(!report.reloaded);
    assert!(host.events().is_empty());

    let pending: Vec<_> = importer
        .candidates()
        .iter()
        .map(|c| c.raw["question_text"].clone())
        .collect();
    assert_eq!(pending, vec![json!("q1"), json!("q3")]);
}

#[tokio::test]
async fn unreshapable_candidate_counts_as_an_indexed_failure() {
    let (session, executor) = session_with(created).await;
    let mut importer = session.importer(Arc::new(RecordingHost::default()));
    let document = json!([candidate("DRAG_DROP", "q0"), candidate("CODE", "q1")]);
    importer.load_str(&document.to_string()).unwrap();

    let report = importer.import_all().await.unwrap();
    assert_eq!(report.failed, vec![0]);
    assert_eq!(report.succeeded, vec![1]);
    assert!(report.error.unwrap().starts_with("Error in Question 1: "));
    assert_eq!(executor.requests_to(HttpMethod::Post, "/api/questions/").len(), 1);
    assert_eq!(importer.candidates()[0].question_type, "DRAG_DROP");
}

#[tokio::test]
async fn network_failure_in_import_uses_the_generic_message() {
    let (session, _) = session_with(|_| Err(AppError::Other("offline".to_string()))).await;
    let mut importer = session.importer(Arc::new(RecordingHost::default()));
    importer
        .load_str(&json!([candidate("CODE", "q0")]).to_string())
        .unwrap();

    let report = importer.import_all().await.unwrap();
    assert_eq!(
        report.error.as_deref(),
        Some("Error in Question 1: An error occurred while submitting the form.")
    );
    assert_eq!(importer.pending_len(), 1);
}

#[tokio::test]
async fn parse_failure_aborts_the_whole_batch() {
    let (session, _) = session_with(created).await;
    let mut importer = session.importer(Arc::new(RecordingHost::default()));
    importer
        .load_str(&json!([candidate("CODE", "kept")]).to_string())
        .unwrap();

    assert!(importer.load_str(r#"[{"question_type": "CODE"}, {"#).is_err());
    assert_eq!(importer.pending_len(), 1);
    assert_eq!(importer.candidates()[0].raw["question_text"], json!("kept"));

    importer.delete_candidate(0).unwrap();
    assert!(importer.import_all().await.is_err());
}

#[tokio::test]
async fn candidates_are_augmented_and_editable_before_import() {
    let (session, _) = session_with(created).await;
    let mut importer = session.importer(Arc::new(RecordingHost::default()));
    let mut item = candidate("DESCRIPTIVE", "original");
    item["exam_references"] = json!([7, "99"]);
    importer.load_str(&json!([item]).to_string()).unwrap();

    let viewed = importer.view_candidate(0).unwrap();
    assert_eq!(viewed.display["topic_name"], json!("Optics"));
    assert_eq!(viewed.display["exam_references_name"], json!(["HSC 2020", "N/A"]));
    assert!(!viewed.raw.contains_key("topic_name"));

    let mut editor = importer.open_candidate_editor(0).unwrap();
    assert_eq!(editor.mode(), FormMode::Import);
    editor.set_question_text("edited").unwrap();
    let SubmitOutcome::Local(edited) = editor.submit().await.unwrap() else {
        panic!("导入模式应当只在本地提交");
    };
    importer.apply_edit(0, edited).unwrap();

    let updated = importer.view_candidate(0).unwrap();
    assert_eq!(updated.raw["question_text"], json!("edited"));
    assert_eq!(updated.display["topic_name"], json!("Optics"));
    assert_eq!(updated.question_type, "DESCRIPTIVE");
    assert!(importer.view_candidate(3).is_err());
}

#[test]
fn augmentation_is_idempotent_against_live_lists() {
    let (session, _) = tokio_test::block_on(session_with(not_found));
    let mut details = base_details();
    details.insert("sub_sub_topic".to_string(), json!(["500", 0]));
    details.insert("difficulty_level".to_string(), json!("8"));

    let once = augment_names(&details, session.resolver());
    let twice = augment_names(&once, session.resolver());
    assert_eq!(once, twice);
    assert_eq!(once["difficulty_level_name"], json!("Easy"));
    assert_eq!(once["target_subject_name"], json!("Physics"));
}

#[test]
fn reshape_rejects_unknown_types_as_configuration_errors() {
    let r = QuestionRecord {
        id: None,
        question_type: "DRAG_DROP".to_string(),
        details: base_details(),
    };
    assert!(reshape(&r).unwrap_err().is_fatal());
}

#[tokio::test]
async fn teardown_drops_cached_lists() {
    let (mut session, _) = session_with(not_found).await;
    assert!(!session.resolver().list(TaxonomyKind::Subject).is_empty());
    session.teardown();
    assert!(!session.is_initialized());
    assert!(session.resolver().list(TaxonomyKind::Subject).is_empty());
}
