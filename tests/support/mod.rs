//! Shared harness: the real router over in-memory repositories.

#![allow(dead_code)]

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64},
    path::Path,
    sync::Arc,
    time::Duration,
};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
    response::Response,
};
use blogroll::{
    application::repos::{
        AuthorsRepo, CreateGroupParams, CreatePostParams, GroupsRepo, PostsWriteRepo,
    },
    cache::ResponseCache,
    config::{
        AuthSettings, CacheSettings, DatabaseSettings, FeedSettings, LogFormat, LoggingSettings,
        ServerSettings, Settings, UploadSettings,
    },
    domain::entities::{AuthorRecord, GroupRecord, PostRecord},
    infra::{
        http::{HttpState, build_router},
        memory::MemoryRepositories,
    },
};
use tempfile::TempDir;
use tower::ServiceExt;
use tracing::level_filters::LevelFilter;

pub const PASSWORD: &str = "correct-horse-battery";

/// A 2x1 GIF.
pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

pub struct TestApp {
    pub router: Router,
    pub repos: Arc<MemoryRepositories>,
    pub index_cache: Option<Arc<ResponseCache>>,
    media: TempDir,
}

pub fn settings(media: &Path, page_size: u32, index_cache: bool) -> Settings {
    Settings {
        server: ServerSettings {
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            graceful_shutdown: Duration::from_secs(1),
        },
        logging: LoggingSettings {
            level: LevelFilter::WARN,
            format: LogFormat::Compact,
        },
        database: DatabaseSettings {
            url: None,
            max_connections: NonZeroU32::new(1).unwrap(),
        },
        feed: FeedSettings {
            page_size: NonZeroU32::new(page_size).unwrap(),
        },
        cache: CacheSettings {
            enable_index_cache: index_cache,
            index_ttl_seconds: NonZeroU64::new(20).unwrap(),
        },
        uploads: UploadSettings {
            directory: media.to_path_buf(),
            max_request_bytes: NonZeroU64::new(1024 * 1024).unwrap(),
        },
        auth: AuthSettings {
            session_inactivity: Duration::from_secs(3600),
            secure_cookies: false,
            password_memory_kib: NonZeroU32::new(64).unwrap(),
            password_iterations: NonZeroU32::new(1).unwrap(),
            password_parallelism: NonZeroU32::new(1).unwrap(),
        },
    }
}

/// Default app: ten posts per page, index cache on.
pub fn app() -> TestApp {
    app_with(10, true)
}

pub fn app_with(page_size: u32, index_cache: bool) -> TestApp {
    let media = tempfile::tempdir().expect("temp media dir");
    let repos = Arc::new(MemoryRepositories::new());
    let settings = settings(media.path(), page_size, index_cache);
    let state = HttpState::from_settings(repos.clone(), &settings).expect("state");
    let index_cache = state.index_cache.clone();
    TestApp {
        router: build_router(state),
        repos,
        index_cache,
        media,
    }
}

impl TestApp {
    pub fn media_root(&self) -> &Path {
        self.media.path()
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn post_multipart(&self, uri: &str, form: Multipart, cookie: &str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, form.content_type())
            .header(COOKIE, cookie)
            .body(Body::from(form.finish()))
            .unwrap();
        self.send(request).await
    }

    /// Register through the sign-up form; returns the author and its session cookie.
    pub async fn sign_up(&self, username: &str) -> (AuthorRecord, String) {
        let body = format!("username={username}&password1={PASSWORD}&password2={PASSWORD}");
        let response = self.post_form("/auth/signup/", &body, None).await;
        assert_eq!(response.status(), StatusCode::FOUND, "sign-up of {username}");
        let cookie = session_cookie(&response);
        let author = self
            .repos
            .find_by_username(username)
            .await
            .unwrap()
            .expect("author stored");
        (author, cookie)
    }

    pub async fn group(&self, slug: &str, title: &str) -> GroupRecord {
        self.repos
            .create_group(CreateGroupParams {
                slug: slug.to_string(),
                title: title.to_string(),
                description: format!("All about {title}"),
            })
            .await
            .unwrap()
    }

    pub async fn post(
        &self,
        author: &AuthorRecord,
        text: &str,
        group: Option<&GroupRecord>,
    ) -> PostRecord {
        self.repos
            .create_post(CreatePostParams {
                author_id: author.id,
                text: text.to_string(),
                group_id: group.map(|group| group.id),
                image: None,
            })
            .await
            .unwrap()
    }

    pub async fn posts(&self, author: &AuthorRecord, count: usize, group: Option<&GroupRecord>) {
        for n in 0..count {
            self.post(author, &format!("post number {n}"), group).await;
        }
    }
}

pub fn session_cookie(response: &Response) -> String {
    let header = response
        .headers()
        .get(SET_COOKIE)
        .expect("session cookie set")
        .to_str()
        .unwrap();
    header.split(';').next().unwrap().to_string()
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(LOCATION)
        .expect("location header")
        .to_str()
        .unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Number of post cards rendered in a feed page.
pub fn card_count(html: &str) -> usize {
    html.matches("class=\"post-card\"").count()
}

/// Minimal multipart/form-data encoder.
pub struct Multipart {
    boundary: &'static str,
    body: Vec<u8>,
}

impl Multipart {
    pub fn new() -> Self {
        Self {
            boundary: "blogroll-test-boundary",
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }
}
