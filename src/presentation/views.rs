use crate::application::error::{ErrorReport, HttpError};
use crate::application::feed::{AuthorProfile, FeedPage, FeedSubject};
use crate::application::forms::FieldErrors;
use crate::application::pagination::{PAGE_PARAM, PageWindow};
use crate::application::posts::PostDetail;
use crate::domain::entities::{AuthorRecord, CommentRecord, GroupRecord, PostId, PostRecord};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

const SITE_TITLE: &str = "Blogroll";
const PUBLISHED_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day] [month repr:short] [year], [hour]:[minute]");
const ISO_DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Themed error page. Falls back to plain text if the template itself fails.
pub fn render_error_page(status: StatusCode, message: &str) -> Response {
    let content = ErrorPageView::new(status, message);
    let view = LayoutContext::new(LayoutChrome::shared(content.title.clone()), content);
    match (ErrorTemplate { view }).render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(err) => {
            let mut response = (status, message.to_string()).into_response();
            ErrorReport::from_error(
                "presentation::views::render_error_page",
                StatusCode::INTERNAL_SERVER_ERROR,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

pub fn render_not_found_response() -> Response {
    let mut response = render_error_page(StatusCode::NOT_FOUND, "Page not found");
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct NavigationLinkView {
    pub label: String,
    pub href: String,
}

impl NavigationLinkView {
    fn new(label: &str, href: &str) -> Self {
        Self {
            label: label.to_string(),
            href: href.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ViewerView {
    pub username: String,
    pub profile_href: String,
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
}

/// Page chrome shared by every template.
#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub navigation: Vec<NavigationLinkView>,
    /// Shared pages show no account links at all.
    pub show_account: bool,
    pub viewer: Option<ViewerView>,
    pub meta: PageMetaView,
}

impl LayoutChrome {
    /// Chrome that is identical for every visitor; used for cacheable pages.
    pub fn shared(title: impl Into<String>) -> Self {
        Self {
            brand: brand(),
            navigation: base_navigation(),
            show_account: false,
            viewer: None,
            meta: page_meta(title.into()),
        }
    }

    /// Chrome with account links for the current visitor.
    pub fn for_viewer(viewer: Option<&AuthorRecord>, title: impl Into<String>) -> Self {
        Self {
            brand: brand(),
            navigation: base_navigation(),
            show_account: true,
            viewer: viewer.map(|author| ViewerView {
                username: author.username.clone(),
                profile_href: profile_href(&author.username),
            }),
            meta: page_meta(title.into()),
        }
    }
}

fn brand() -> BrandView {
    BrandView {
        title: SITE_TITLE.to_string(),
        href: "/".to_string(),
    }
}

fn base_navigation() -> Vec<NavigationLinkView> {
    vec![
        NavigationLinkView::new("Home", "/"),
        NavigationLinkView::new("Following", "/follow/"),
        NavigationLinkView::new("New post", "/create/"),
        NavigationLinkView::new("About the author", "/about/author/"),
        NavigationLinkView::new("Technologies", "/about/tech/"),
    ]
}

fn page_meta(title: String) -> PageMetaView {
    let title = if title.is_empty() {
        SITE_TITLE.to_string()
    } else {
        format!("{title} | {SITE_TITLE}")
    };
    PageMetaView { title }
}

pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub navigation: Vec<NavigationLinkView>,
    pub show_account: bool,
    pub viewer: Option<ViewerView>,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            navigation: chrome.navigation,
            show_account: chrome.show_account,
            viewer: chrome.viewer,
            meta: chrome.meta,
            content,
        }
    }
}

pub fn profile_href(username: &str) -> String {
    format!("/profile/{username}/")
}

pub fn post_href(id: PostId) -> String {
    format!("/posts/{id}/")
}

pub fn media_href(stored_path: &str) -> String {
    format!("/media/{stored_path}")
}

fn format_published(at: OffsetDateTime) -> String {
    at.format(PUBLISHED_FORMAT).unwrap_or_default()
}

fn format_iso_date(at: OffsetDateTime) -> String {
    at.format(ISO_DATE_FORMAT).unwrap_or_default()
}

#[derive(Clone)]
pub struct GroupBadge {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub id: PostId,
    pub text: String,
    pub excerpt: String,
    pub author_username: String,
    pub author_href: String,
    pub published: String,
    pub iso_date: String,
    pub group: Option<GroupBadge>,
    pub image_url: Option<String>,
    pub detail_href: String,
}

impl From<&PostRecord> for PostCard {
    fn from(post: &PostRecord) -> Self {
        Self {
            id: post.id,
            text: post.text.clone(),
            excerpt: post.excerpt(),
            author_username: post.author_username.clone(),
            author_href: profile_href(&post.author_username),
            published: format_published(post.created_at),
            iso_date: format_iso_date(post.created_at),
            group: post.group.as_ref().map(|group| GroupBadge {
                title: group.title.clone(),
                href: format!("/group/{}/", group.slug),
            }),
            image_url: post.image.as_deref().map(media_href),
            detail_href: post_href(post.id),
        }
    }
}

/// Previous/next links around the current page.
pub struct PaginatorView {
    pub number: u64,
    pub total_pages: u64,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
    pub first_href: String,
    pub last_href: String,
    pub show: bool,
}

impl PaginatorView {
    pub fn new(base_path: &str, window: &PageWindow) -> Self {
        let href = |number: u64| format!("{base_path}?{PAGE_PARAM}={number}");
        Self {
            number: window.number(),
            total_pages: window.total_pages(),
            previous_href: window.previous_number().map(href),
            next_href: window.next_number().map(href),
            first_href: href(1),
            last_href: href(window.total_pages()),
            show: window.total_pages() > 1,
        }
    }
}

pub struct FeedView {
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
    pub has_results: bool,
    pub total_count: u64,
}

impl FeedView {
    pub fn new(base_path: &str, page: &FeedPage) -> Self {
        let posts: Vec<PostCard> = page.page.items.iter().map(PostCard::from).collect();
        Self {
            has_results: !posts.is_empty(),
            posts,
            paginator: PaginatorView::new(base_path, &page.page.window),
            total_count: page.page.window.total_items(),
        }
    }
}

pub struct IndexContent {
    pub feed: FeedView,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexContent>,
}

pub struct GroupHeader {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl From<&GroupRecord> for GroupHeader {
    fn from(group: &GroupRecord) -> Self {
        Self {
            title: group.title.clone(),
            slug: group.slug.clone(),
            description: group.description.clone(),
        }
    }
}

pub struct GroupContent {
    pub group: GroupHeader,
    pub feed: FeedView,
}

impl GroupContent {
    pub fn from_page(page: &FeedPage) -> Option<Self> {
        let FeedSubject::Group(group) = &page.subject else {
            return None;
        };
        Some(Self {
            group: GroupHeader::from(group),
            feed: FeedView::new(&format!("/group/{}/", group.slug), page),
        })
    }
}

#[derive(Template)]
#[template(path = "group_list.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupContent>,
}

pub struct ProfileHeader {
    pub username: String,
    pub display_name: String,
    pub post_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
    pub following: bool,
    pub can_follow: bool,
    pub follow_href: String,
    pub unfollow_href: String,
}

impl ProfileHeader {
    fn new(profile: &AuthorProfile, signed_in: bool) -> Self {
        let username = &profile.author.username;
        Self {
            username: username.clone(),
            display_name: profile.author.display_name(),
            post_count: profile.post_count,
            follower_count: profile.follower_count,
            following_count: profile.following_count,
            following: profile.following,
            can_follow: signed_in && !profile.is_self,
            follow_href: format!("/profile/{username}/follow/"),
            unfollow_href: format!("/profile/{username}/unfollow/"),
        }
    }
}

pub struct ProfileContent {
    pub profile: ProfileHeader,
    pub feed: FeedView,
}

impl ProfileContent {
    pub fn from_page(page: &FeedPage, signed_in: bool) -> Option<Self> {
        let FeedSubject::Author(profile) = &page.subject else {
            return None;
        };
        Some(Self {
            feed: FeedView::new(&profile_href(&profile.author.username), page),
            profile: ProfileHeader::new(profile, signed_in),
        })
    }
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileContent>,
}

pub struct FollowContent {
    pub feed: FeedView,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<FollowContent>,
}

pub struct CommentView {
    pub author_username: String,
    pub author_href: String,
    pub text: String,
    pub published: String,
}

impl From<&CommentRecord> for CommentView {
    fn from(comment: &CommentRecord) -> Self {
        Self {
            author_username: comment.author_username.clone(),
            author_href: profile_href(&comment.author_username),
            text: comment.text.clone(),
            published: format_published(comment.created_at),
        }
    }
}

pub struct CommentFormView {
    pub action: String,
    pub text: String,
    pub error: Option<String>,
}

pub struct PostDetailContent {
    pub post: PostCard,
    pub author_name: String,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub edit_href: String,
    /// Present only for signed-in viewers.
    pub comment_form: Option<CommentFormView>,
}

impl PostDetailContent {
    pub fn new(detail: &PostDetail, viewer: Option<&AuthorRecord>) -> Self {
        let post = PostCard::from(&detail.post);
        let comment_form = viewer.map(|_| CommentFormView {
            action: format!("/posts/{}/comment/", detail.post.id),
            text: String::new(),
            error: None,
        });
        Self {
            edit_href: format!("/posts/{}/edit/", detail.post.id),
            can_edit: viewer.is_some_and(|author| author.id == detail.post.author_id),
            author_name: detail.author.display_name(),
            author_post_count: detail.author_post_count,
            comments: detail.comments.iter().map(CommentView::from).collect(),
            comment_form,
            post,
        }
    }

    /// Refill the comment form after a rejected submission.
    pub fn with_comment_error(mut self, text: String, error: Option<String>) -> Self {
        if let Some(form) = self.comment_form.as_mut() {
            form.text = text;
            form.error = error;
        }
        self
    }
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailContent>,
}

pub struct GroupOption {
    pub id: String,
    pub title: String,
    pub selected: bool,
}

pub struct PostFormContent {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub current_image: Option<String>,
    pub errors: FieldErrors,
}

impl PostFormContent {
    pub fn create(groups: &[GroupRecord]) -> Self {
        Self {
            is_edit: false,
            action: "/create/".to_string(),
            text: String::new(),
            groups: group_options(groups, ""),
            current_image: None,
            errors: FieldErrors::new(),
        }
    }

    pub fn edit(post: &PostRecord, groups: &[GroupRecord]) -> Self {
        let selected = post
            .group
            .as_ref()
            .map(|group| group.id.to_string())
            .unwrap_or_default();
        Self {
            is_edit: true,
            action: format!("/posts/{}/edit/", post.id),
            text: post.text.clone(),
            groups: group_options(groups, &selected),
            current_image: post.image.as_deref().map(media_href),
            errors: FieldErrors::new(),
        }
    }

    /// Re-display submitted values together with their validation errors.
    pub fn with_submission(
        mut self,
        text: String,
        group: &str,
        groups: &[GroupRecord],
        errors: FieldErrors,
    ) -> Self {
        self.text = text;
        self.groups = group_options(groups, group.trim());
        self.errors = errors;
        self
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field)
    }
}

fn group_options(groups: &[GroupRecord], selected: &str) -> Vec<GroupOption> {
    groups
        .iter()
        .map(|group| {
            let id = group.id.to_string();
            GroupOption {
                selected: id == selected,
                id,
                title: group.title.clone(),
            }
        })
        .collect()
}

#[derive(Template)]
#[template(path = "post_create.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormContent>,
}

pub struct LoginContent {
    pub username: String,
    pub next: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginContent>,
}

#[derive(Default)]
pub struct SignupContent {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub errors: FieldErrors,
}

impl SignupContent {
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field)
    }
}

#[derive(Template)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupContent>,
}

#[derive(Template)]
#[template(path = "auth/logged_out.html")]
pub struct LoggedOutTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "about/author.html")]
pub struct AboutAuthorTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "about/tech.html")]
pub struct AboutTechTemplate {
    pub view: LayoutContext<()>,
}

pub struct ErrorPageView {
    pub status_code: u16,
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn new(status: StatusCode, message: &str) -> Self {
        let title = match status {
            StatusCode::NOT_FOUND => "Page not found".to_string(),
            StatusCode::FORBIDDEN => "Access denied".to_string(),
            status if status.is_server_error() => "Something went wrong".to_string(),
            status => status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string(),
        };
        let message = match status {
            StatusCode::NOT_FOUND => {
                "The page you requested does not exist. Try returning to the homepage.".to_string()
            }
            _ => message.to_string(),
        };
        Self {
            status_code: status.as_u16(),
            title,
            message,
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
