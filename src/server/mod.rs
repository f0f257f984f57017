//! JSON API server with content watching

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::content::{ContentError, PostRepository};
use crate::convert::{self, ConvertError};
use crate::gallery::Gallery;
use crate::resume::{Resume, ResumeError};
use crate::Site;

/// Posts shown on the home page
const HOME_POSTS: usize = 3;

/// Shared handler state
pub struct AppState {
    pub repo: Arc<PostRepository>,
    pub gallery: Arc<Gallery>,
    pub cv_dir: PathBuf,
    pub graph_dir: PathBuf,
}

impl AppState {
    pub fn new(site: &Site) -> Result<Self> {
        Ok(Self {
            repo: Arc::new(site.repository()?),
            gallery: Arc::new(site.gallery()),
            cv_dir: site.cv_dir.clone(),
            graph_dir: site.graph_dir.clone(),
        })
    }

    /// Drop every cached listing
    fn invalidate(&self) {
        self.repo.invalidate();
        self.gallery.invalidate();
    }
}

/// Errors returned by API handlers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Resume(ResumeError),

    #[error(transparent)]
    Convert(ConvertError),
}

impl From<ResumeError> for ApiError {
    fn from(e: ResumeError) -> Self {
        match e {
            ResumeError::NotJson(name) => ApiError::NotFound(format!("No resume named {}", name)),
            ResumeError::Io { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                ApiError::NotFound(format!("No resume at {:?}", path))
            }
            e => ApiError::Resume(e),
        }
    }
}

impl From<ConvertError> for ApiError {
    fn from(e: ConvertError) -> Self {
        match e {
            ConvertError::Io { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                ApiError::NotFound(format!("No graph at {:?}", path))
            }
            ConvertError::Html(source) => ApiError::BadRequest(source.to_string()),
            e => ApiError::Convert(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Content(_) | ApiError::Resume(_) | ApiError::Convert(_) => {
                tracing::error!("Request failed: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

type ApiResult = std::result::Result<Json<Value>, ApiError>;

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/home", get(home))
        .route("/api/posts", get(posts))
        .route("/api/posts/:slug", get(post_by_slug))
        .route("/api/search", get(search))
        .route("/api/humor", get(humor))
        .route("/api/resume/:filename", get(resume))
        .route("/api/md_maker", post(md_maker))
        .route("/api/graph-data/:name", get(graph_data))
        .route("/json/:number", get(square))
        .route("/dev/reload", get(reload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server
pub async fn start(site: &Site, ip: &str, port: u16, watch: bool) -> Result<()> {
    let state = Arc::new(AppState::new(site)?);
    let app = router(state.clone());

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    if watch {
        println!("Watching {:?} for changes...", site.content_dir);
    }
    println!("Press Ctrl+C to stop.");

    if watch {
        let dirs = vec![site.content_dir.clone(), site.humor_dir.clone()];
        let state = state.clone();

        tokio::task::spawn_blocking(move || {
            if let Err(e) = watch_and_invalidate(dirs, state) {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Invalidate the caches whenever a watched directory changes
fn watch_and_invalidate(dirs: Vec<PathBuf>, state: Arc<AppState>) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

    for dir in &dirs {
        if dir.exists() {
            debouncer.watcher().watch(dir, RecursiveMode::Recursive)?;
            tracing::debug!("Watching: {:?}", dir);
        }
    }

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant: Vec<_> = events
                    .iter()
                    .filter(|e| {
                        let path_str = e.path.to_string_lossy();
                        !path_str.contains(".git")
                            && !path_str.contains(".DS_Store")
                            && !path_str.ends_with('~')
                    })
                    .collect();

                if relevant.is_empty() {
                    continue;
                }

                for event in &relevant {
                    tracing::info!("File changed: {}", event.path.display());
                }
                state.invalidate();
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

async fn home(State(state): State<Arc<AppState>>) -> ApiResult {
    let posts = state.repo.latest(HOME_POSTS).await?;
    let humor = match state.gallery.images().await {
        Ok(images) => images.first().cloned(),
        Err(e) => {
            tracing::warn!("Gallery unavailable: {}", e);
            None
        }
    };

    Ok(Json(json!({ "posts": posts, "humor": humor })))
}

async fn posts(State(state): State<Arc<AppState>>) -> ApiResult {
    let posts = state.repo.load_all().await?;
    Ok(Json(json!(*posts)))
}

async fn post_by_slug(State(state): State<Arc<AppState>>, Path(slug): Path<String>) -> ApiResult {
    match state.repo.get_by_slug(&slug).await? {
        Some(post) => Ok(Json(json!(post))),
        None => Err(ApiError::NotFound(format!("No post with slug {}", slug))),
    }
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult {
    let hits = state.repo.search(&params.q).await?;
    Ok(Json(json!(hits)))
}

async fn humor(State(state): State<Arc<AppState>>) -> ApiResult {
    let images = state.gallery.images().await?;
    Ok(Json(json!(*images)))
}

async fn resume(State(state): State<Arc<AppState>>, Path(filename): Path<String>) -> ApiResult {
    let loaded = Resume::load(&state.cv_dir, &filename)?;

    Ok(Json(json!({
        "resume": loaded.document,
        "mermaid": loaded.mermaid_timeline(),
    })))
}

#[derive(Deserialize)]
struct MdMakerRequest {
    #[serde(default)]
    html: String,
}

async fn md_maker(Json(request): Json<MdMakerRequest>) -> ApiResult {
    let markdown = convert::html_to_markdown(&request.html)?;
    Ok(Json(json!({ "markdown": markdown })))
}

async fn graph_data(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> ApiResult {
    let is_plain_name =
        std::path::Path::new(&name).file_name().and_then(|n| n.to_str()) == Some(name.as_str());
    if !is_plain_name {
        return Err(ApiError::NotFound(format!("No graph named {}", name)));
    }

    let graph = convert::read_graphml(&state.graph_dir.join(&name))?;
    Ok(Json(json!(graph)))
}

async fn square(Path(number): Path<i64>) -> ApiResult {
    let squared = number
        .checked_mul(number)
        .ok_or_else(|| ApiError::BadRequest(format!("{} squared overflows", number)))?;
    Ok(Json(json!({ "input": number, "squared": squared })))
}

async fn reload(State(state): State<Arc<AppState>>) -> ApiResult {
    state.invalidate();
    Ok(Json(json!({ "ok": true, "reloaded": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use std::fs;

    struct TestServer {
        base: String,
        dir: tempfile::TempDir,
    }

    impl TestServer {
        async fn get(&self, path: &str) -> (u16, Value) {
            let response = reqwest::get(format!("{}{}", self.base, path)).await.unwrap();
            Self::read(response).await
        }

        async fn post_json(&self, path: &str, body: &Value) -> (u16, Value) {
            let response = reqwest::Client::new()
                .post(format!("{}{}", self.base, path))
                .header("content-type", "application/json")
                .body(body.to_string())
                .send()
                .await
                .unwrap();
            Self::read(response).await
        }

        async fn read(response: reqwest::Response) -> (u16, Value) {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap();
            (status, serde_json::from_str(&body).unwrap())
        }
    }

    async fn spawn_site() -> TestServer {
        let dir = tempfile::tempdir().unwrap();
        let content = dir.path().join("content");
        let humor = dir.path().join("static/img/humor");
        let cv = dir.path().join("cv-db");
        let graphs = dir.path().join("graph");
        fs::create_dir_all(&content).unwrap();
        fs::create_dir_all(&humor).unwrap();
        fs::create_dir_all(&cv).unwrap();
        fs::create_dir_all(&graphs).unwrap();

        let dates = [
            ("one", "2024-01-01"),
            ("two", "2024-02-01"),
            ("three", "2024-03-01"),
            ("four", "2024-04-01"),
        ];
        for (name, date) in dates {
            fs::write(
                content.join(format!("{}.md", name)),
                format!(
                    "---\ntitle: Post {}\ncreate_date: {}\n---\nBody of {}.\n",
                    name, date, name
                ),
            )
            .unwrap();
        }
        fs::write(humor.join("b.png"), b"x").unwrap();
        fs::write(humor.join("a.jpg"), b"x").unwrap();
        fs::write(
            cv.join("me.json"),
            r#"{"work": [{"company": "Acme", "position": "Dev", "startDate": "2020"}]}"#,
        )
        .unwrap();

        fs::write(
            graphs.join("skills.graphml"),
            r#"<graphml><key id="d0" for="node" attr.name="label" attr.type="string"/>
<graph edgedefault="undirected"><node id="a"><data key="d0">A</data></node><node id="b"/>
<edge source="a" target="b"/></graph></graphml>"#,
        )
        .unwrap();

        let mut config = SiteConfig::default();
        config.plantuml.verify = false;
        let site = Site::with_config(dir.path().to_path_buf(), config);
        let state = Arc::new(AppState::new(&site).unwrap());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });

        TestServer {
            base: format!("http://{}", addr),
            dir,
        }
    }

    #[tokio::test]
    async fn test_home() {
        let server = spawn_site().await;
        let (status, body) = server.get("/api/home").await;
        assert_eq!(status, 200);

        let slugs: Vec<_> = body["posts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["slug"].as_str().unwrap())
            .collect();
        assert_eq!(slugs, vec!["four", "three", "two"]);
        assert_eq!(body["humor"], "img/humor/a.jpg");
    }

    #[tokio::test]
    async fn test_posts_and_slug_lookup() {
        let server = spawn_site().await;

        let (status, body) = server.get("/api/posts").await;
        assert_eq!(status, 200);
        assert_eq!(body.as_array().unwrap().len(), 4);

        let (status, body) = server.get("/api/posts/two").await;
        assert_eq!(status, 200);
        assert_eq!(body["slug"], "two");
        assert!(body["html"].as_str().unwrap().contains("Body of two."));
        assert!(body.get("source").is_none());

        let (status, body) = server.get("/api/posts/missing").await;
        assert_eq!(status, 404);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_search_and_humor() {
        let server = spawn_site().await;

        let (_, body) = server.get("/api/search?q=BODY%20OF%20THREE").await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["slug"], "three");

        let (_, body) = server.get("/api/search").await;
        assert_eq!(body.as_array().unwrap().len(), 4);

        let (_, body) = server.get("/api/humor").await;
        assert_eq!(body, json!(["img/humor/a.jpg", "img/humor/b.png"]));
    }

    #[tokio::test]
    async fn test_resume() {
        let server = spawn_site().await;

        let (status, body) = server.get("/api/resume/me.json").await;
        assert_eq!(status, 200);
        assert_eq!(body["resume"]["work"][0]["company"], "Acme");
        assert!(body["mermaid"]
            .as_str()
            .unwrap()
            .contains("Start ->>+ Acme: Dev - (2020 to Present)"));

        let (status, _) = server.get("/api/resume/me.txt").await;
        assert_eq!(status, 404);
        let (status, _) = server.get("/api/resume/other.json").await;
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn test_square() {
        let server = spawn_site().await;
        let (status, body) = server.get("/json/12").await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({ "input": 12, "squared": 144 }));

        let (status, _) = server.get(&format!("/json/{}", i64::MAX)).await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn test_reload_picks_up_new_posts() {
        let server = spawn_site().await;
        let (_, body) = server.get("/api/posts").await;
        assert_eq!(body.as_array().unwrap().len(), 4);

        fs::write(
            server.dir.path().join("content/five.md"),
            "---\ncreate_date: 2024-05-01\n---\nfive\n",
        )
        .unwrap();
        let (_, body) = server.get("/api/posts").await;
        assert_eq!(body.as_array().unwrap().len(), 4);

        let (status, body) = server.get("/dev/reload").await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({ "ok": true, "reloaded": true }));

        let (_, body) = server.get("/api/posts").await;
        assert_eq!(body.as_array().unwrap().len(), 5);
        assert_eq!(body[0]["slug"], "five");
    }

    #[tokio::test]
    async fn test_md_maker() {
        let server = spawn_site().await;

        let (status, body) = server
            .post_json("/api/md_maker", &json!({ "html": "<p>Hi <em>there</em></p>" }))
            .await;
        assert_eq!(status, 200);
        let markdown = body["markdown"].as_str().unwrap();
        assert!(markdown.starts_with("Hi "));
        assert!(markdown.contains("there"));
        assert!(!markdown.contains("<em>"));

        let (status, body) = server.post_json("/api/md_maker", &json!({ "html": "" })).await;
        assert_eq!(status, 200);
        assert!(body["markdown"].is_null());
    }

    #[tokio::test]
    async fn test_graph_data() {
        let server = spawn_site().await;

        let (status, body) = server.get("/api/graph-data/skills.graphml").await;
        assert_eq!(status, 200);
        assert_eq!(body["directed"], false);
        assert_eq!(body["nodes"][0], json!({ "id": "a", "label": "A" }));
        assert_eq!(body["links"][0], json!({ "source": "a", "target": "b" }));

        let (status, _) = server.get("/api/graph-data/missing.graphml").await;
        assert_eq!(status, 404);
        let (status, _) = server.get("/api/graph-data/..%2Fcv-db%2Fme.json").await;
        assert_eq!(status, 404);
    }
}
