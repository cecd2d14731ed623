//! Paginated inline keyboards.
//!
//! [`Pagination`] lays out one page of item buttons plus navigation
//! controls. It is recomputed from scratch on every [`Pagination::create`].
//!
//! ```rust,ignore
//! let mut pages = bot.pagination();
//! pages
//!     .items(products.iter().map(|p| Button::cb(&p.name, format!("product_{}", p.id))))
//!     .per_page(6)?
//!     .columns(2)?
//!     .page(page)?
//!     .prefix("shop_")?
//!     .mode(PaginationMode::Numbers)
//!     .side_signs("«", "»")
//!     .return_btn("⬅️ Back", "menu");
//!
//! bot.msg("Products").inline_kbd(pages.keyboard()).send().await?;
//! router.on_callback("shop_%n").func(show_page);
//! ```
//!
//! Navigation buttons carry `{prefix}{page}` as callback data.

use skiff_core::{Button, Key};

use crate::error::PaginationError;

/// Callback prefix used unless one is set.
pub const DEFAULT_PREFIX: &str = "page_";

const MAX_COLUMNS: usize = 8;
const MAX_PAGE_BUTTONS: usize = 8;

/// What the navigation row shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaginationMode {
    /// `<` and `>`.
    #[default]
    Arrows,
    /// A sliding window of page numbers.
    Numbers,
}

/// How navigation buttons are split into rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaginationLayout {
    /// Everything in one row.
    #[default]
    Row,
    /// Arrows or numbers in one row, first/last page buttons in the next.
    Split,
    /// One row when there are exactly two navigation buttons, split otherwise.
    Smart,
}

/// Glyphs of page numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NumberStyle {
    #[default]
    Classic,
    /// Keycap emoji per digit: `10` becomes `1️⃣0️⃣`.
    Emoji,
}

/// Paginated keyboard builder.
#[derive(Debug, Clone)]
pub struct Pagination {
    items: Vec<Button>,
    per_page: usize,
    page: usize,
    columns: usize,
    max_page_buttons: usize,
    prefix: String,
    mode: PaginationMode,
    layout: PaginationLayout,
    style: NumberStyle,
    prev_label: String,
    next_label: String,
    side_signs: Option<(String, String)>,
    active_format: (String, String),
    header: Vec<Vec<Button>>,
    footer: Vec<Vec<Button>>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            per_page: 10,
            page: 1,
            columns: 1,
            max_page_buttons: 5,
            prefix: DEFAULT_PREFIX.to_string(),
            mode: PaginationMode::default(),
            layout: PaginationLayout::default(),
            style: NumberStyle::default(),
            prev_label: "<".to_string(),
            next_label: ">".to_string(),
            side_signs: None,
            active_format: (String::new(), String::new()),
            header: Vec::new(),
            footer: Vec::new(),
        }
    }
}

impl Pagination {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    pub fn items(&mut self, items: impl IntoIterator<Item = Button>) -> &mut Self {
        self.items = items.into_iter().collect();
        self
    }

    pub fn per_page(&mut self, per_page: usize) -> Result<&mut Self, PaginationError> {
        if per_page == 0 {
            return Err(PaginationError::PerPage(per_page));
        }
        self.per_page = per_page;
        Ok(self)
    }

    /// Current page, 1-based. `0` shows the first page; pages past the end
    /// show the last one.
    pub fn page(&mut self, page: i64) -> Result<&mut Self, PaginationError> {
        let page = usize::try_from(page).map_err(|_| PaginationError::Page(page))?;
        self.page = page;
        Ok(self)
    }

    pub fn columns(&mut self, columns: usize) -> Result<&mut Self, PaginationError> {
        if !(1..=MAX_COLUMNS).contains(&columns) {
            return Err(PaginationError::Columns(columns));
        }
        self.columns = columns;
        Ok(self)
    }

    /// Width of the page number window.
    pub fn max_page_buttons(&mut self, count: usize) -> Result<&mut Self, PaginationError> {
        if !(1..=MAX_PAGE_BUTTONS).contains(&count) {
            return Err(PaginationError::MaxPageButtons(count));
        }
        self.max_page_buttons = count;
        Ok(self)
    }

    pub fn prefix(&mut self, prefix: impl Into<String>) -> Result<&mut Self, PaginationError> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(PaginationError::EmptyPrefix);
        }
        self.prefix = prefix;
        Ok(self)
    }

    pub fn mode(&mut self, mode: PaginationMode) -> &mut Self {
        self.mode = mode;
        self
    }

    pub fn layout(&mut self, layout: PaginationLayout) -> &mut Self {
        self.layout = layout;
        self
    }

    pub fn number_style(&mut self, style: NumberStyle) -> &mut Self {
        self.style = style;
        self
    }

    /// Labels of the previous/next arrows.
    pub fn arrows(&mut self, prev: impl Into<String>, next: impl Into<String>) -> &mut Self {
        self.prev_label = prev.into();
        self.next_label = next.into();
        self
    }

    /// Adds first/last page buttons with these labels.
    pub fn side_signs(&mut self, first: impl Into<String>, last: impl Into<String>) -> &mut Self {
        self.side_signs = Some((first.into(), last.into()));
        self
    }

    /// Label of the current page in numbers mode; `%s` is the number.
    pub fn active_page_format(&mut self, format: &str) -> &mut Self {
        self.active_format = match format.split_once("%s") {
            Some((left, right)) => (left.to_string(), right.to_string()),
            None => (format.to_string(), String::new()),
        };
        self
    }

    /// Wraps the current page number in numbers mode.
    pub fn active_page_wrap(&mut self, left: impl Into<String>, right: impl Into<String>) -> &mut Self {
        self.active_format = (left.into(), right.into());
        self
    }

    /// Adds a row above the items.
    pub fn header_row(&mut self, row: Vec<Button>) -> &mut Self {
        self.header.push(row);
        self
    }

    /// Adds a row below the navigation.
    pub fn footer_row(&mut self, row: Vec<Button>) -> &mut Self {
        self.footer.push(row);
        self
    }

    /// Adds a single-button row below the navigation.
    pub fn return_btn(&mut self, text: impl Into<String>, callback_data: impl Into<String>) -> &mut Self {
        self.footer_row(vec![Button::cb(text, callback_data)])
    }

    // ========================================================================
    // Layout
    // ========================================================================

    pub fn total_pages(&self) -> usize {
        self.items.len().div_ceil(self.per_page)
    }

    /// The page actually shown.
    pub fn current_page(&self) -> usize {
        self.page.clamp(1, self.total_pages().max(1))
    }

    /// Items of the current page.
    pub fn page_items(&self) -> &[Button] {
        let start = (self.current_page() - 1) * self.per_page;
        let end = (start + self.per_page).min(self.items.len());
        self.items.get(start..end).unwrap_or_default()
    }

    /// Builds the keyboard rows.
    pub fn create(&self) -> Vec<Vec<Button>> {
        let mut rows = self.header.clone();
        rows.extend(self.page_items().chunks(self.columns).map(<[Button]>::to_vec));

        let (inner, outer) = self.navigation();
        let nav_count = inner.len() + usize::from(outer.0.is_some()) + usize::from(outer.1.is_some());
        let mut nav_rows = match self.layout {
            PaginationLayout::Row => vec![merge(inner, outer)],
            PaginationLayout::Split => vec![inner, split_outer(outer)],
            PaginationLayout::Smart if nav_count == 2 => vec![merge(inner, outer)],
            PaginationLayout::Smart => vec![inner, split_outer(outer)],
        };
        nav_rows.retain(|row| !row.is_empty());
        rows.extend(nav_rows);

        rows.extend(self.footer.iter().cloned());
        rows
    }

    /// [`Pagination::create`] as keyboard rows for the message builder.
    pub fn keyboard(&self) -> Vec<Vec<Key>> {
        self.create()
            .into_iter()
            .map(|row| row.into_iter().map(Key::Button).collect())
            .collect()
    }

    /// Inner buttons (arrows or numbers) and the optional first/last pair.
    fn navigation(&self) -> (Vec<Button>, (Option<Button>, Option<Button>)) {
        let total = self.total_pages();
        let page = self.current_page();

        let (inner, show_first, show_last) = match self.mode {
            PaginationMode::Arrows => {
                if total <= 1 {
                    return (Vec::new(), (None, None));
                }
                let mut inner = Vec::with_capacity(2);
                if page > 1 {
                    inner.push(self.nav(&self.prev_label, page - 1));
                }
                if page < total {
                    inner.push(self.nav(&self.next_label, page + 1));
                }
                (inner, page > 1, page < total)
            }
            PaginationMode::Numbers => {
                let (start, end) = self.window(page, total);
                let inner = (start..=end)
                    .filter(|_| total > 0)
                    .map(|n| {
                        let label = self.number(n);
                        if n == page {
                            let (left, right) = &self.active_format;
                            self.nav(&format!("{left}{label}{right}"), n)
                        } else {
                            self.nav(&label, n)
                        }
                    })
                    .collect();
                (inner, start > 1, end < total)
            }
        };

        let outer = match &self.side_signs {
            Some((first, last)) => (
                show_first.then(|| self.nav(first, 1)),
                show_last.then(|| self.nav(last, total)),
            ),
            None => (None, None),
        };
        (inner, outer)
    }

    /// First and last page of the number window around `page`.
    fn window(&self, page: usize, total: usize) -> (usize, usize) {
        let width = self.max_page_buttons.min(total);
        if width == 0 {
            return (1, 0);
        }
        let start = page
            .saturating_sub(width / 2)
            .clamp(1, total - width + 1);
        (start, start + width - 1)
    }

    fn number(&self, n: usize) -> String {
        match self.style {
            NumberStyle::Classic => n.to_string(),
            NumberStyle::Emoji => n
                .to_string()
                .chars()
                .map(|digit| format!("{digit}\u{FE0F}\u{20E3}"))
                .collect(),
        }
    }

    fn nav(&self, label: &str, page: usize) -> Button {
        Button::cb(label, format!("{}{page}", self.prefix))
    }
}

fn merge(inner: Vec<Button>, (first, last): (Option<Button>, Option<Button>)) -> Vec<Button> {
    first.into_iter().chain(inner).chain(last).collect()
}

fn split_outer((first, last): (Option<Button>, Option<Button>)) -> Vec<Button> {
    first.into_iter().chain(last).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(count: usize) -> Vec<Button> {
        (1..=count)
            .map(|i| Button::cb(format!("Item {i}"), format!("btn_{i}")))
            .collect()
    }

    fn texts(row: &[Button]) -> Vec<&str> {
        row.iter().map(|b| b.text.as_str()).collect()
    }

    #[test]
    fn test_total_pages() {
        let mut p = Pagination::new();
        p.items(items(10)).per_page(5).unwrap();
        assert_eq!(p.total_pages(), 2);

        p.items(items(11));
        assert_eq!(p.total_pages(), 3);

        p.items(Vec::new());
        assert_eq!(p.total_pages(), 0);
        assert!(p.create().is_empty());
    }

    #[test]
    fn test_pages_partition_items() {
        let mut p = Pagination::new();
        p.items(items(7)).per_page(3).unwrap();

        let mut seen = Vec::new();
        for page in 1..=3 {
            p.page(page).unwrap();
            seen.extend(p.page_items().iter().map(|b| b.text.clone()));
        }
        let expected: Vec<String> = (1..=7).map(|i| format!("Item {i}")).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_slicing_and_columns() {
        let mut p = Pagination::new();
        p.items(items(10)).per_page(2).unwrap().page(2).unwrap();
        let rows = p.create();
        assert_eq!(rows[0][0].text, "Item 3");
        assert_eq!(rows[1][0].text, "Item 4");

        let mut p = Pagination::new();
        p.items(items(4)).per_page(4).unwrap().columns(2).unwrap();
        let rows = p.create();
        assert_eq!(texts(&rows[0]), ["Item 1", "Item 2"]);
    }

    #[test]
    fn test_arrow_visibility() {
        let mut p = Pagination::new();
        p.items(items(30)).prefix("p_").unwrap();

        p.page(1).unwrap();
        let rows = p.create();
        assert_eq!(texts(rows.last().unwrap()), [">"]);
        assert_eq!(rows.last().unwrap()[0].callback_data.as_deref(), Some("p_2"));

        p.page(2).unwrap();
        assert_eq!(texts(p.create().last().unwrap()), ["<", ">"]);

        p.page(3).unwrap();
        assert_eq!(texts(p.create().last().unwrap()), ["<"]);

        p.items(items(10));
        assert_eq!(p.create().len(), 10);
    }

    #[test]
    fn test_numbers_mode() {
        let mut p = Pagination::new();
        p.items(items(50))
            .page(3)
            .unwrap()
            .mode(PaginationMode::Numbers)
            .active_page_format("- %s -");

        let rows = p.create();
        let nav = rows.last().unwrap();
        assert_eq!(nav.len(), 5);
        assert_eq!(nav[0].callback_data.as_deref(), Some("page_1"));
        assert_eq!(nav[2].text, "- 3 -");
        assert_eq!(nav[2].callback_data.as_deref(), Some("page_3"));
    }

    #[test]
    fn test_numbers_sliding_window() {
        let mut p = Pagination::new();
        p.items(items(100)).mode(PaginationMode::Numbers);

        p.page(1).unwrap();
        assert_eq!(texts(p.create().last().unwrap()), ["1", "2", "3", "4", "5"]);

        p.page(5).unwrap();
        assert_eq!(texts(p.create().last().unwrap()), ["3", "4", "5", "6", "7"]);

        p.page(10).unwrap();
        assert_eq!(texts(p.create().last().unwrap()), ["6", "7", "8", "9", "10"]);
    }

    #[test]
    fn test_window_never_wider_than_total() {
        let mut p = Pagination::new();
        p.items(items(20)).mode(PaginationMode::Numbers).page(2).unwrap();
        assert_eq!(texts(p.create().last().unwrap()), ["1", "2"]);
    }

    #[test]
    fn test_emoji_digits() {
        let mut p = Pagination::new();
        p.items(items(100))
            .page(10)
            .unwrap()
            .mode(PaginationMode::Numbers)
            .number_style(NumberStyle::Emoji);

        let rows = p.create();
        assert_eq!(rows.last().unwrap().last().unwrap().text, "1️⃣0️⃣");
    }

    #[test]
    fn test_active_page_wrap() {
        let mut p = Pagination::new();
        p.items(items(30))
            .mode(PaginationMode::Numbers)
            .active_page_wrap(">> ", " <<");

        let rows = p.create();
        assert_eq!(texts(rows.last().unwrap()), [">> 1 <<", "2", "3"]);
    }

    #[test]
    fn test_split_layout() {
        let mut p = Pagination::new();
        p.items(items(100))
            .page(5)
            .unwrap()
            .side_signs("First", "Last")
            .layout(PaginationLayout::Split);

        let rows = p.create();
        let n = rows.len();
        assert_eq!(texts(&rows[n - 1]), ["First", "Last"]);
        assert_eq!(rows[n - 1][1].callback_data.as_deref(), Some("page_10"));
        assert_eq!(texts(&rows[n - 2]), ["<", ">"]);
    }

    #[test]
    fn test_row_layout_keeps_side_signs_outside() {
        let mut p = Pagination::new();
        p.items(items(100)).page(5).unwrap().side_signs("«", "»");
        assert_eq!(texts(p.create().last().unwrap()), ["«", "<", ">", "»"]);

        p.page(1).unwrap();
        assert_eq!(texts(p.create().last().unwrap()), [">", "»"]);
    }

    #[test]
    fn test_smart_layout() {
        let mut p = Pagination::new();
        p.items(items(50)).page(2).unwrap().layout(PaginationLayout::Smart);
        let rows = p.create();
        assert_eq!(rows.last().unwrap().len(), 2);
        assert_eq!(rows.len(), 10 + 1);

        p.side_signs("<<", ">>");
        let rows = p.create();
        let n = rows.len();
        assert_eq!(texts(&rows[n - 2]), ["<", ">"]);
        assert_eq!(texts(&rows[n - 1]), ["<<", ">>"]);
    }

    #[test]
    fn test_smart_layout_merges_arrow_and_side_sign() {
        let mut p = Pagination::new();
        p.items(items(50))
            .side_signs("<<", ">>")
            .layout(PaginationLayout::Smart);

        let rows = p.create();
        assert_eq!(rows.len(), 10 + 1);
        assert_eq!(texts(rows.last().unwrap()), [">", ">>"]);
        assert_eq!(rows.last().unwrap()[1].callback_data.as_deref(), Some("page_5"));

        p.page(5).unwrap();
        assert_eq!(texts(p.create().last().unwrap()), ["<<", "<"]);
    }

    #[test]
    fn test_header_and_return_rows() {
        let mut p = Pagination::new();
        p.items(items(5))
            .per_page(5)
            .unwrap()
            .header_row(vec![Button::cb("Top", "top")])
            .return_btn("Back Menu", "menu_cb");

        let rows = p.create();
        assert_eq!(rows[0], vec![Button::cb("Top", "top")]);
        let last = rows.last().unwrap();
        assert_eq!(last[0].text, "Back Menu");
        assert_eq!(last[0].callback_data.as_deref(), Some("menu_cb"));
        assert_eq!(rows.len(), 1 + 5 + 1);
    }

    #[test]
    fn test_out_of_range_page_is_clamped() {
        let mut p = Pagination::new();
        p.items(items(25)).page(0).unwrap();
        assert_eq!(p.current_page(), 1);
        p.page(99).unwrap();
        assert_eq!(p.current_page(), 3);
        assert_eq!(p.page_items().len(), 5);
    }

    #[test]
    fn test_validation() {
        let mut p = Pagination::new();
        assert_eq!(p.per_page(0).unwrap_err(), PaginationError::PerPage(0));
        assert_eq!(p.page(-1).unwrap_err(), PaginationError::Page(-1));
        assert_eq!(p.columns(0).unwrap_err(), PaginationError::Columns(0));
        assert_eq!(p.columns(9).unwrap_err(), PaginationError::Columns(9));
        assert_eq!(
            p.max_page_buttons(0).unwrap_err(),
            PaginationError::MaxPageButtons(0)
        );
        assert_eq!(p.prefix("").unwrap_err(), PaginationError::EmptyPrefix);
    }
}
