//! Turns backend payloads into slides.
//!
//! A `ContentSource` describes what a display shows: a live schedule, the
//! pay-per-view catalog of a channel, or the player diagnostics. Each
//! load produces a complete, ordered slide list; nothing is ever patched in place.

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDateTime};
use log::{debug, warn};

use crate::api_client::Backend;
use crate::errors::ApiError;
use crate::model::{DataRow, Level, PlayerInfo, PpvContent, PpvSlide, ScheduleBlock, Slide};
use crate::presentation::Variation;

/// How far ahead the next-up lookup searches.
pub const NEXT_UP_WINDOW_HOURS: i64 = 4;
/// Number of detail slots on a bump.
pub const MAX_DETAIL_LINES: usize = 3;

#[derive(Clone, Debug, PartialEq)]
pub enum ContentSource {
    /// Upcoming shows of a schedule source, rendered as a single bump slide.
    Schedule { source_id: String },
    PayPerView { channel: u32, variation: Variation },
    Diagnostics { rows_per_slide: usize },
}

impl ContentSource {
    /// Builds the full slide list from one fetch.
    #[must_use = "loading content can fail; the Result must be handled"]
    pub async fn load(&self, backend: &dyn Backend, now: NaiveDateTime) -> Result<Vec<Slide>, ApiError> {
        match self {
            ContentSource::Schedule { source_id } => {
                let end = now + ChronoDuration::hours(NEXT_UP_WINDOW_HOURS);
                let blocks = backend.schedule(source_id, now, end).await?;
                Ok(vec![Slide::Bump { title: source_id.clone(), detail_lines: next_up_lines(&blocks, now) }])
            }
            ContentSource::PayPerView { channel, variation } => {
                let contents = backend.ppv_contents(*channel, *variation).await?;
                Ok(ppv_slides(&contents))
            }
            ContentSource::Diagnostics { rows_per_slide } => {
                let info = backend.player_info().await?;
                Ok(diagnostics_slides(&info, *rows_per_slide))
            }
        }
    }
}

/// Parses a schedule timestamp as local wall-clock time.
pub fn parse_schedule_time(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(naive) = raw.parse::<NaiveDateTime>() {
        return Some(naive);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Local).naive_local())
}

/// `7:05 PM` style time used on the bump.
pub fn format_show_time(start: NaiveDateTime) -> String {
    start.format("%-I:%M %p").to_string()
}

/// Upcoming shows as bump detail lines: strictly after `now`, inside the next-up
/// window, ascending, at most three, `"<time> - <title>"`.
pub fn next_up_lines(blocks: &[ScheduleBlock], now: NaiveDateTime) -> Vec<String> {
    let window_end = now + ChronoDuration::hours(NEXT_UP_WINDOW_HOURS);
    let mut upcoming: Vec<(NaiveDateTime, &ScheduleBlock)> = blocks
        .iter()
        .filter_map(|block| match parse_schedule_time(&block.start_time) {
            Some(start) => Some((start, block)),
            None => {
                warn!("Skipping schedule block with unparsable start time '{}'", block.start_time);
                None
            }
        })
        .filter(|(start, _)| *start > now && *start <= window_end)
        .collect();
    upcoming.sort_by_key(|(start, _)| *start);
    debug!("{} upcoming show(s) within {}h of {}", upcoming.len(), NEXT_UP_WINDOW_HOURS, now);

    upcoming
        .into_iter()
        .take(MAX_DETAIL_LINES)
        .map(|(start, block)| {
            let title = block.title.as_deref().filter(|t| !t.is_empty()).unwrap_or("Untitled");
            format!("{} - {}", format_show_time(start), title)
        })
        .collect()
}

pub fn ppv_slides(contents: &[PpvContent]) -> Vec<Slide> {
    contents
        .iter()
        .map(|content| {
            let nfo = content.nfo.clone().unwrap_or_default();
            let image_url = if content.has_image { content.image_url.clone().filter(|u| !u.is_empty()) } else { None };
            Slide::Ppv(PpvSlide {
                title: nfo.title.filter(|t| !t.is_empty()).unwrap_or_else(|| content.filename.clone()),
                subtitle_info: nfo.info.unwrap_or_default(),
                description: nfo.description.unwrap_or_default(),
                image_url,
                media_path: content.video_path.clone(),
            })
        })
        .collect()
}

pub fn temperature_level(celsius: Option<f64>) -> Level {
    match celsius {
        Some(c) if c > 75.0 => Level::High,
        Some(c) if c < 40.0 => Level::Low,
        _ => Level::Normal,
    }
}

pub fn memory_level(used_percent: f64) -> Level {
    if used_percent > 80.0 {
        Level::High
    } else if used_percent < 50.0 {
        Level::Low
    } else {
        Level::Normal
    }
}

/// One slide per diagnostics section present in `info`, in a fixed order.
pub fn diagnostics_slides(info: &PlayerInfo, rows_per_slide: usize) -> Vec<Slide> {
    let mut slides = Vec::new();
    let mut push = |title: &str, mut rows: Vec<DataRow>| {
        if rows.is_empty() {
            return;
        }
        rows.truncate(rows_per_slide);
        slides.push(Slide::Diagnostics { title: title.to_string(), rows });
    };

    if let Some(system) = &info.system {
        let or_unknown = |v: &Option<String>| v.clone().filter(|s| !s.is_empty()).unwrap_or_else(|| "Unknown".to_string());
        push(
            "SYSTEM INFORMATION",
            vec![
                DataRow::new("Platform", or_unknown(&system.platform)),
                DataRow::new("Architecture", or_unknown(&system.architecture)),
                DataRow::new("Hostname", or_unknown(&system.hostname)),
            ],
        );
    }

    let level = temperature_level(info.temperature_c);
    let mut temperature = Vec::new();
    if let Some(c) = info.temperature_c {
        temperature.push(DataRow::new("CPU Temperature", format!("{}°C", c)).with_level(level));
    }
    if let Some(f) = info.temperature_f {
        temperature.push(DataRow::new("CPU Temperature", format!("{}°F", f)).with_level(level));
    }
    push("TEMPERATURE", temperature);

    if let Some(memory) = &info.memory {
        let mut rows = Vec::new();
        if let Some(total) = memory.total_gb {
            rows.push(DataRow::new("Total", format!("{} GB", total)));
        }
        if let Some(used) = memory.used_percent {
            rows.push(DataRow::new("Used", format!("{}%", used)).with_level(memory_level(used)));
        }
        if let Some(available) = memory.available_gb {
            rows.push(DataRow::new("Available", format!("{} GB", available)));
        }
        push("MEMORY STATUS", rows);
    }

    if let Some(cpu) = &info.cpu {
        let mut rows = Vec::new();
        if let Some(cores) = cpu.cores {
            rows.push(DataRow::new("CPU Cores", cores.to_string()));
        }
        if let Some(load) = cpu.load_percent {
            rows.push(DataRow::new("CPU Load", format!("{}%", load)));
        }
        if let Some(avg) = cpu.load_1min {
            rows.push(DataRow::new("Load Avg", format!("{:.2}", avg)));
        }
        push("CPU STATUS", rows);
    }

    slides
}
