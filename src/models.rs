// Core data structures for the blog scraper

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// Post metadata from the search endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PostMeta {
    pub url: String,
    pub title: String,
    pub author: String,
    pub blog_name: String,
    pub date: String, // YYYY.MM.DD, empty when unknown
    pub blog_id: String,
    pub log_no: u64,
    pub snippet: String,
}

/// Post metadata plus page-derived details
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PostDetail {
    #[serde(flatten)]
    pub meta: PostMeta,
    pub content: String,
    pub likes: u64,
    pub comments: u64,
}

impl PostDetail {
    /// Detail record without any page work
    ///
    /// Content is the search snippet in preview mode and empty otherwise.
    pub fn from_meta(meta: PostMeta, mode: ContentMode) -> Self {
        let content = match mode {
            ContentMode::Preview => meta.snippet.clone(),
            ContentMode::Full | ContentMode::None => String::new(),
        };
        Self {
            meta,
            content,
            likes: 0,
            comments: 0,
        }
    }

    /// Value of a single output field
    pub fn field_value(&self, field: Field) -> Value {
        match field {
            Field::Title => Value::from(self.meta.title.as_str()),
            Field::Url => Value::from(self.meta.url.as_str()),
            Field::Content => Value::from(self.content.as_str()),
            Field::Author => Value::from(self.meta.author.as_str()),
            Field::BlogName => Value::from(self.meta.blog_name.as_str()),
            Field::Date => Value::from(self.meta.date.as_str()),
            Field::Likes => Value::from(self.likes),
            Field::Comments => Value::from(self.comments),
        }
    }

    /// Output record restricted to the given fields
    pub fn to_record(&self, fields: &[Field]) -> Map<String, Value> {
        fields
            .iter()
            .map(|f| (f.as_str().to_string(), self.field_value(*f)))
            .collect()
    }
}

/// Output field, declared in canonical column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Url,
    Content,
    Author,
    BlogName,
    Date,
    Likes,
    Comments,
}

impl Field {
    /// All fields in canonical order
    pub const ALL: [Field; 8] = [
        Self::Title,
        Self::Url,
        Self::Content,
        Self::Author,
        Self::BlogName,
        Self::Date,
        Self::Likes,
        Self::Comments,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Url => "url",
            Self::Content => "content",
            Self::Author => "author",
            Self::BlogName => "blog_name",
            Self::Date => "date",
            Self::Likes => "likes",
            Self::Comments => "comments",
        }
    }

    /// Korean column label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Title => "제목",
            Self::Url => "URL",
            Self::Content => "내용",
            Self::Author => "작성자",
            Self::BlogName => "블로그명",
            Self::Date => "날짜",
            Self::Likes => "좋아요",
            Self::Comments => "댓글",
        }
    }

    /// Spreadsheet column width
    pub fn column_width(&self) -> f64 {
        match self {
            Self::Title => 40.0,
            Self::Url => 50.0,
            Self::Content => 80.0,
            Self::Author => 15.0,
            Self::BlogName => 20.0,
            Self::Date => 15.0,
            Self::Likes | Self::Comments => 10.0,
        }
    }

    /// Whether the field holds a count rather than text
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Likes | Self::Comments)
    }

    /// Parse a wire name
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s.trim())
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Requested output fields
///
/// `All` is the legacy behaviour when the client sends no filter at all. It
/// implies likes and comments, and therefore browser-driven scraping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldSelection {
    #[default]
    All,
    Only(BTreeSet<Field>),
}

impl FieldSelection {
    /// Explicit selection; title is always added
    pub fn only(fields: impl IntoIterator<Item = Field>) -> Self {
        let mut set: BTreeSet<Field> = fields.into_iter().collect();
        set.insert(Field::Title);
        Self::Only(set)
    }

    /// Parse a comma separated list; empty input selects all fields
    ///
    /// Unknown names are ignored.
    pub fn parse(list: &str) -> Self {
        let names: Vec<&str> = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if names.is_empty() {
            return Self::All;
        }
        Self::only(names.into_iter().filter_map(Field::parse))
    }

    /// Build from a list of names, as sent by the export endpoint
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        if names.is_empty() {
            return Self::All;
        }
        Self::only(names.iter().filter_map(|n| Field::parse(n.as_ref())))
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Whether a field was requested
    pub fn wants(&self, field: Field) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(&field),
        }
    }

    /// Whether the run needs a browser
    ///
    /// Full content, likes and comments only exist on the rendered page.
    pub fn needs_browser(&self, mode: ContentMode) -> bool {
        mode == ContentMode::Full || self.wants(Field::Likes) || self.wants(Field::Comments)
    }

    /// Fields present in output records, in canonical order
    ///
    /// Content follows the content mode rather than the filter: it is always
    /// present unless the mode is `none`.
    pub fn active_fields(&self, mode: ContentMode) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| match f {
                Field::Title => true,
                Field::Content => mode != ContentMode::None,
                other => self.wants(*other),
            })
            .collect()
    }
}

/// What the `content` field carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    /// Search snippet
    #[default]
    Preview,
    /// Full rendered post text
    Full,
    /// No content
    None,
}

impl ContentMode {
    /// Parse a mode name, falling back to preview for anything unknown
    pub fn parse_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "full" => Self::Full,
            "none" => Self::None,
            _ => Self::Preview,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preview => "preview",
            Self::Full => "full",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for ContentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validated scrape request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub keyword: String,
    pub start_date: String, // YYYY-MM-DD
    pub end_date: String,   // YYYY-MM-DD
    pub fields: FieldSelection,
    pub content_mode: ContentMode,
}

impl ScrapeRequest {
    /// Build and validate a request
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRequest` when the keyword or a date is missing,
    /// a date is not `YYYY-MM-DD`, or the range is reversed.
    pub fn new(
        keyword: &str,
        start_date: &str,
        end_date: &str,
        fields: FieldSelection,
        content_mode: ContentMode,
    ) -> Result<Self> {
        let keyword = keyword.trim();
        let start_date = start_date.trim();
        let end_date = end_date.trim();

        if keyword.is_empty() || start_date.is_empty() || end_date.is_empty() {
            return Err(Error::invalid_request(
                "키워드, 시작일, 종료일을 모두 입력해주세요.",
            ));
        }

        let start = parse_date(start_date)?;
        let end = parse_date(end_date)?;
        if start > end {
            return Err(Error::invalid_request(format!(
                "시작일({start_date})이 종료일({end_date})보다 늦습니다."
            )));
        }

        Ok(Self {
            keyword: keyword.to_string(),
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            fields,
            content_mode,
        })
    }

    /// Fields present in output records
    pub fn active_fields(&self) -> Vec<Field> {
        self.fields.active_fields(self.content_mode)
    }

    /// Whether this request runs browser-driven
    pub fn needs_browser(&self) -> bool {
        self.fields.needs_browser(self.content_mode)
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| Error::invalid_request(format!("잘못된 날짜 형식입니다: {s} (YYYY-MM-DD)")))
}
