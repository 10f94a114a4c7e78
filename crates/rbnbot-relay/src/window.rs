//! Spot aggregation window.
//!
//! Spots accepted between two publish ticks accumulate here as rendered
//! fragments. [`SpotAggregator::flush`] takes the whole window in one step,
//! leaving an empty one behind, then deduplicates by spotted call (first
//! arrival wins) and joins the survivors into one batch.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use rbnbot_core::config::RelayConfig;
use rbnbot_core::SpotEvent;

/// Prefix marking a user-announced schedule in the batch.
const SKED_MARK: &str = "💚💚💚💚";

/// Presentation of one fragment in the sink's markdown dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentTemplate {
    /// Link target; `{freq}` is replaced by the frequency in kHz.
    pub link_template: String,
    /// Placed between the link, the call and the rate.
    pub separator: String,
}

impl FragmentTemplate {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            link_template: config.link_template.clone(),
            separator: config.separator.clone(),
        }
    }

    /// `<icon> [<freq> kHz](<url>)<sep><call><sep><wpm>wpm`
    pub fn render_spot(&self, event: &SpotEvent) -> String {
        format!(
            "{} {}",
            event.icon,
            self.body(&event.frequency_khz, &event.spotted, &event.wpm)
        )
    }

    /// A schedule announcement, rendered bold behind a green marker.
    pub fn render_sked(&self, sked: &Sked) -> String {
        format!(
            "{SKED_MARK} **{}**",
            self.body(&sked.frequency_khz, &sked.call, &sked.wpm)
        )
    }

    fn body(&self, freq: &str, call: &str, wpm: &str) -> String {
        let url = self.link_template.replace("{freq}", freq);
        let sep = &self.separator;
        format!("[{freq} kHz]({url}){sep}{call}{sep}{wpm}wpm")
    }
}

/// A user's announcement that they are available on a frequency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sked {
    pub frequency_khz: String,
    pub call: String,
    pub wpm: String,
}

/// One rendered line of a batch, keyed by the call it reports.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fragment {
    call: String,
    text: String,
}

/// Deduplicated, rendered window contents ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBatch {
    pub text: String,
    /// Length of `text` in characters.
    pub chars: usize,
    /// Fragments that survived deduplication.
    pub fragments: usize,
}

/// Result of draining the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was accepted since the last flush.
    Empty,
    /// The batch reached the size limit and was discarded whole.
    Oversized { chars: usize, limit: usize },
    Ready(RenderedBatch),
}

/// Accumulates rendered spots between publish ticks.
pub struct SpotAggregator {
    template: FragmentTemplate,
    max_chars: usize,
    window: Mutex<Vec<Fragment>>,
}

impl SpotAggregator {
    pub fn new(template: FragmentTemplate, max_chars: usize) -> Self {
        Self {
            template,
            max_chars,
            window: Mutex::new(Vec::new()),
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(FragmentTemplate::from_config(config), config.max_batch_chars)
    }

    pub fn template(&self) -> &FragmentTemplate {
        &self.template
    }

    /// Render `event` and append it to the current window.
    pub fn accept(&self, event: &SpotEvent) {
        let text = self.template.render_spot(event);
        self.push(Fragment {
            call: event.spotted.clone(),
            text,
        });
    }

    /// Append a user-announced schedule to the current window.
    pub fn accept_sked(&self, sked: &Sked) {
        let text = self.template.render_sked(sked);
        self.push(Fragment {
            call: sked.call.clone(),
            text,
        });
    }

    /// Fragments waiting in the current window (before dedup).
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Take the current window, leaving it empty, and render it.
    ///
    /// A batch whose rendered length reaches the size limit is dropped whole,
    /// never truncated or split.
    pub fn flush(&self) -> FlushOutcome {
        let fragments = std::mem::take(&mut *self.lock());
        if fragments.is_empty() {
            return FlushOutcome::Empty;
        }

        let mut seen = HashSet::new();
        let kept: Vec<String> = fragments
            .into_iter()
            .filter(|f| seen.insert(f.call.clone()))
            .map(|f| f.text)
            .collect();

        let text = kept.join("\n");
        let chars = text.chars().count();
        if chars >= self.max_chars {
            return FlushOutcome::Oversized {
                chars,
                limit: self.max_chars,
            };
        }

        FlushOutcome::Ready(RenderedBatch {
            text,
            chars,
            fragments: kept.len(),
        })
    }

    fn push(&self, fragment: Fragment) {
        self.lock().push(fragment);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Fragment>> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbnbot_core::UNKNOWN_ICON;

    fn template() -> FragmentTemplate {
        FragmentTemplate {
            link_template: "http://sdr.example/?tune={freq}cw".into(),
            separator: " ".into(),
        }
    }

    fn spot(spotted: &str, freq: &str, wpm: &str) -> SpotEvent {
        SpotEvent {
            spotter: "HA6PX".into(),
            spotted: spotted.into(),
            frequency_khz: freq.into(),
            wpm: wpm.into(),
            icon: "🔵",
        }
    }

    fn ready(outcome: FlushOutcome) -> RenderedBatch {
        match outcome {
            FlushOutcome::Ready(batch) => batch,
            other => panic!("expected a ready batch, got {other:?}"),
        }
    }

    #[test]
    fn renders_reference_fragment() {
        let text = template().render_spot(&spot("HB9IIH", "3534.0", "26"));
        assert_eq!(
            text,
            "🔵 [3534.0 kHz](http://sdr.example/?tune=3534.0cw) HB9IIH 26wpm"
        );
    }

    #[test]
    fn default_separator_is_ideographic_space() {
        let agg = SpotAggregator::from_config(&RelayConfig::default());
        let mut ev = spot("HB9IIH", "3534.0", "26");
        ev.icon = UNKNOWN_ICON;
        let text = agg.template().render_spot(&ev);
        assert_eq!(
            text,
            "◯ [3534.0 kHz](http://websdr.ewi.utwente.nl:8901/?tune=3534.0cw)\u{3000}HB9IIH\u{3000}26wpm"
        );
    }

    #[test]
    fn flush_keeps_first_occurrence_in_arrival_order() {
        let agg = SpotAggregator::new(template(), 1024);
        agg.accept(&spot("A1AA", "7010.0", "12"));
        agg.accept(&spot("B1BB", "7020.0", "15"));
        agg.accept(&spot("A1AA", "14050.0", "18"));

        let batch = ready(agg.flush());
        assert_eq!(batch.fragments, 2);
        let lines: Vec<&str> = batch.text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("A1AA") && lines[0].contains("7010.0"));
        assert!(lines[1].contains("B1BB"));
        assert!(!batch.text.contains("14050.0"));
        assert_eq!(batch.chars, batch.text.chars().count());
    }

    #[test]
    fn second_flush_is_empty() {
        let agg = SpotAggregator::new(template(), 1024);
        agg.accept(&spot("A1AA", "7010.0", "12"));
        assert!(matches!(agg.flush(), FlushOutcome::Ready(_)));
        assert_eq!(agg.flush(), FlushOutcome::Empty);
        assert_eq!(agg.pending(), 0);
    }

    #[test]
    fn batch_at_limit_is_dropped_whole() {
        let one = template().render_spot(&spot("A1AA", "7010.0", "12"));
        let len = one.chars().count();

        let exact = SpotAggregator::new(template(), len);
        exact.accept(&spot("A1AA", "7010.0", "12"));
        assert_eq!(
            exact.flush(),
            FlushOutcome::Oversized {
                chars: len,
                limit: len
            }
        );

        let roomy = SpotAggregator::new(template(), len + 1);
        roomy.accept(&spot("A1AA", "7010.0", "12"));
        assert_eq!(ready(roomy.flush()).chars, len);
    }

    #[test]
    fn oversized_flush_still_resets_window() {
        let agg = SpotAggregator::new(template(), 10);
        agg.accept(&spot("A1AA", "7010.0", "12"));
        assert!(matches!(agg.flush(), FlushOutcome::Oversized { .. }));
        assert_eq!(agg.flush(), FlushOutcome::Empty);
    }

    #[test]
    fn sked_dedups_against_spots() {
        let agg = SpotAggregator::new(template(), 1024);
        let sked = Sked {
            frequency_khz: "28050.0".into(),
            call: "IV3ZZZ".into(),
            wpm: "15".into(),
        };
        agg.accept_sked(&sked);
        agg.accept(&spot("IV3ZZZ", "7010.0", "12"));

        let batch = ready(agg.flush());
        assert_eq!(
            batch.text,
            "💚💚💚💚 **[28050.0 kHz](http://sdr.example/?tune=28050.0cw) IV3ZZZ 15wpm**"
        );
    }
}
