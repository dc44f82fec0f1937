//! # Curve board: named, appendable, archivable numeric series.
//!
//! Maintains live cost curves keyed by `(figure, curve)` and periodically
//! redraws them through the [`Surface`] seam. Samples arriving out of order
//! (concurrent producers) are kept sorted by iteration; redraws are
//! rate-limited per figure so high-frequency appends coalesce into few draws.
//!
//! Ending a curve archives its series: the trace stays in every subsequent
//! frame, but later appends under the same key start a fresh series.

use std::time::{Duration, Instant};

use futures::FutureExt;
use std::panic::AssertUnwindSafe;

use crate::envelope::{CurveStyle, Scale};
use crate::error::RenderError;
use crate::render::surface::{CurveFrame, Sample, SeriesView, Surface};

/// One recorded series with its resolved style.
struct Series {
    points: Vec<Sample>,
    scale: Scale,
    line_style: String,
}

impl Series {
    /// Inserts keeping points sorted by iteration; equal iterations keep
    /// insertion order.
    fn push_sorted(&mut self, sample: Sample) {
        let at = self
            .points
            .partition_point(|p| p.iteration <= sample.iteration);
        self.points.insert(at, sample);
    }

    fn next_iteration(&self) -> u64 {
        self.points.last().map_or(1, |p| p.iteration + 1)
    }
}

/// Live and retired series under one curve key.
#[derive(Default)]
struct CurveSlot {
    live: Option<Series>,
    archived: Vec<Series>,
}

/// All curves of one figure plus its redraw budget.
struct FigureState {
    /// Insertion order preserved so legends are stable.
    curves: Vec<(String, CurveSlot)>,
    last_draw: Option<Instant>,
}

/// Stateful live-plot updater keyed by `(figure, curve)`.
pub(crate) struct CurveBoard {
    interval: Duration,
    default_line_style: String,
    figures: Vec<(String, FigureState)>,
}

impl CurveBoard {
    pub(crate) fn new(interval: Duration, default_line_style: String) -> Self {
        Self {
            interval,
            default_line_style,
            figures: Vec::new(),
        }
    }

    /// Applies one cost entry: append (or archive when `end`) and redraw the
    /// figure if its rate-limit budget allows.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn record(
        &mut self,
        surface: &mut dyn Surface,
        figure: &str,
        curve: &str,
        cost: f64,
        iteration: Option<u64>,
        end: bool,
        style: &CurveStyle,
        now: Instant,
    ) -> Result<(), RenderError> {
        if end {
            // Final redraw while the series is still live, then retire it.
            let result = self.redraw(surface, figure, now).await;
            let slot = self.slot(figure, curve);
            if let Some(series) = slot.live.take() {
                slot.archived.push(series);
            }
            return result;
        }

        let default_style = self.default_line_style.clone();
        let slot = self.slot(figure, curve);
        let series = slot.live.get_or_insert_with(|| Series {
            points: Vec::new(),
            scale: style.scale,
            line_style: style
                .line_style
                .clone()
                .unwrap_or(default_style),
        });
        if let Some(line_style) = &style.line_style {
            series.line_style = line_style.clone();
        }
        let iteration = iteration.unwrap_or_else(|| series.next_iteration());
        series.push_sorted(Sample {
            iteration,
            value: cost,
        });

        if self.draw_due(figure, now) {
            self.redraw(surface, figure, now).await
        } else {
            Ok(())
        }
    }

    /// Redraws one figure through the surface, catching panics from the
    /// surface implementation so a bad backend cannot kill the handler.
    ///
    /// The redraw timestamp advances even on failure; a broken surface is
    /// retried at the redraw interval, not per sample.
    async fn redraw(
        &mut self,
        surface: &mut dyn Surface,
        figure: &str,
        now: Instant,
    ) -> Result<(), RenderError> {
        let Some((_, fig)) = self.figures.iter_mut().find(|(n, _)| n == figure) else {
            return Ok(());
        };
        fig.last_draw = Some(now);

        let mut series = Vec::new();
        for (name, slot) in &fig.curves {
            for retired in &slot.archived {
                series.push(SeriesView {
                    curve: name,
                    archived: true,
                    scale: retired.scale,
                    line_style: &retired.line_style,
                    points: &retired.points,
                });
            }
            if let Some(live) = &slot.live {
                series.push(SeriesView {
                    curve: name,
                    archived: false,
                    scale: live.scale,
                    line_style: &live.line_style,
                    points: &live.points,
                });
            }
        }

        let frame = CurveFrame { figure, series };
        let draw = surface.draw(frame);
        match AssertUnwindSafe(draw).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(RenderError::Panicked {
                detail: panic_detail(panic),
            }),
        }
    }

    fn draw_due(&self, figure: &str, now: Instant) -> bool {
        self.figures
            .iter()
            .find(|(n, _)| n == figure)
            .map_or(true, |(_, fig)| {
                fig.last_draw
                    .map_or(true, |last| now.duration_since(last) >= self.interval)
            })
    }

    fn slot(&mut self, figure: &str, curve: &str) -> &mut CurveSlot {
        let fig_idx = match self.figures.iter().position(|(n, _)| n == figure) {
            Some(idx) => idx,
            None => {
                self.figures.push((
                    figure.to_string(),
                    FigureState {
                        curves: Vec::new(),
                        last_draw: None,
                    },
                ));
                self.figures.len() - 1
            }
        };
        let fig = &mut self.figures[fig_idx].1;
        let curve_idx = match fig.curves.iter().position(|(n, _)| n == curve) {
            Some(idx) => idx,
            None => {
                fig.curves.push((curve.to_string(), CurveSlot::default()));
                fig.curves.len() - 1
            }
        };
        &mut fig.curves[curve_idx].1
    }

    #[cfg(test)]
    pub(crate) fn live_points(&self, figure: &str, curve: &str) -> Vec<Sample> {
        self.figures
            .iter()
            .find(|(n, _)| n == figure)
            .and_then(|(_, fig)| fig.curves.iter().find(|(n, _)| n == curve))
            .and_then(|(_, slot)| slot.live.as_ref())
            .map(|s| s.points.clone())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn archived_lens(&self, figure: &str, curve: &str) -> Vec<usize> {
        self.figures
            .iter()
            .find(|(n, _)| n == figure)
            .and_then(|(_, fig)| fig.curves.iter().find(|(n, _)| n == curve))
            .map(|(_, slot)| slot.archived.iter().map(|s| s.points.len()).collect())
            .unwrap_or_default()
    }
}

fn panic_detail(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSurface {
        draws: Arc<AtomicUsize>,
        legend: Arc<std::sync::Mutex<Vec<String>>>,
    }

    impl CountingSurface {
        fn new() -> (Self, Arc<AtomicUsize>) {
            let draws = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    draws: draws.clone(),
                    legend: Arc::new(std::sync::Mutex::new(Vec::new())),
                },
                draws,
            )
        }
    }

    #[async_trait]
    impl Surface for CountingSurface {
        async fn draw(&mut self, frame: CurveFrame<'_>) -> Result<(), RenderError> {
            self.draws.fetch_add(1, Ordering::SeqCst);
            let mut legend = self.legend.lock().unwrap();
            *legend = frame.series.iter().map(|s| s.curve.to_string()).collect();
            Ok(())
        }
    }

    struct PanickingSurface;

    #[async_trait]
    impl Surface for PanickingSurface {
        async fn draw(&mut self, _frame: CurveFrame<'_>) -> Result<(), RenderError> {
            panic!("axes gone");
        }
    }

    fn board(interval_ms: u64) -> CurveBoard {
        CurveBoard::new(Duration::from_millis(interval_ms), "-o".to_string())
    }

    #[tokio::test]
    async fn test_out_of_order_appends_stay_sorted() {
        let (mut surface, _) = CountingSurface::new();
        let mut board = board(0);
        let t0 = Instant::now();
        let style = CurveStyle::default();

        for it in [5u64, 1, 3, 2, 4] {
            board
                .record(&mut surface, "run", "loss", 0.1, Some(it), false, &style, t0)
                .await
                .unwrap();
        }

        let iters: Vec<u64> = board
            .live_points("run", "loss")
            .iter()
            .map(|s| s.iteration)
            .collect();
        assert_eq!(iters, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_equal_iterations_keep_insertion_order() {
        let (mut surface, _) = CountingSurface::new();
        let mut board = board(0);
        let t0 = Instant::now();
        let style = CurveStyle::default();

        for value in [1.0, 2.0, 3.0] {
            board
                .record(&mut surface, "run", "loss", value, Some(7), false, &style, t0)
                .await
                .unwrap();
        }

        let values: Vec<f64> = board
            .live_points("run", "loss")
            .iter()
            .map(|s| s.value)
            .collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn test_auto_iteration_continues_past_last() {
        let (mut surface, _) = CountingSurface::new();
        let mut board = board(0);
        let t0 = Instant::now();
        let style = CurveStyle::default();

        for value in [9.0, 8.0, 7.0] {
            board
                .record(&mut surface, "run", "loss", value, None, false, &style, t0)
                .await
                .unwrap();
        }
        board
            .record(&mut surface, "run", "loss", 6.0, Some(10), false, &style, t0)
            .await
            .unwrap();
        board
            .record(&mut surface, "run", "loss", 5.0, None, false, &style, t0)
            .await
            .unwrap();

        let iters: Vec<u64> = board
            .live_points("run", "loss")
            .iter()
            .map(|s| s.iteration)
            .collect();
        assert_eq!(iters, vec![1, 2, 3, 10, 11]);
    }

    #[tokio::test]
    async fn test_end_archives_and_restarts_series() {
        let (mut surface, _) = CountingSurface::new();
        let mut board = board(0);
        let t0 = Instant::now();
        let style = CurveStyle::default();

        for _ in 0..3 {
            board
                .record(&mut surface, "run", "loss", 1.0, None, false, &style, t0)
                .await
                .unwrap();
        }
        board
            .record(&mut surface, "run", "loss", 0.0, None, true, &style, t0)
            .await
            .unwrap();
        for _ in 0..2 {
            board
                .record(&mut surface, "run", "loss", 2.0, None, false, &style, t0)
                .await
                .unwrap();
        }

        assert_eq!(board.archived_lens("run", "loss"), vec![3]);
        assert_eq!(board.live_points("run", "loss").len(), 2);
        // Fresh series restarts its auto-assigned iterations.
        assert_eq!(board.live_points("run", "loss")[0].iteration, 1);
    }

    #[tokio::test]
    async fn test_redraws_coalesce_under_rate_limit() {
        let (mut surface, draws) = CountingSurface::new();
        let mut board = board(400);
        let t0 = Instant::now();
        let style = CurveStyle::default();

        // 1000 samples inside a 50ms window: far fewer redraws than samples.
        for i in 0..1000u64 {
            let now = t0 + Duration::from_micros(i * 50);
            board
                .record(&mut surface, "run1", "loss", 1.0, Some(i), false, &style, now)
                .await
                .unwrap();
        }

        assert_eq!(board.live_points("run1", "loss").len(), 1000);
        let drawn = draws.load(Ordering::SeqCst);
        assert!(drawn < 1000, "redraws not coalesced: {drawn}");
        assert_eq!(drawn, 1, "only the first draw fits in one interval");
    }

    #[tokio::test]
    async fn test_end_forces_final_redraw() {
        let (mut surface, draws) = CountingSurface::new();
        let mut board = board(400);
        let t0 = Instant::now();
        let style = CurveStyle::default();

        board
            .record(&mut surface, "run", "loss", 1.0, None, false, &style, t0)
            .await
            .unwrap();
        board
            .record(&mut surface, "run", "loss", 0.0, None, true, &style, t0)
            .await
            .unwrap();

        assert_eq!(draws.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_legend_includes_every_curve() {
        let (mut surface, _) = CountingSurface::new();
        let legend = surface.legend.clone();
        let mut board = board(0);
        let t0 = Instant::now();
        let style = CurveStyle::default();

        board
            .record(&mut surface, "run", "train", 1.0, None, false, &style, t0)
            .await
            .unwrap();
        board
            .record(&mut surface, "run", "valid", 1.0, None, false, &style, t0)
            .await
            .unwrap();

        assert_eq!(*legend.lock().unwrap(), vec!["train", "valid"]);
    }

    #[tokio::test]
    async fn test_surface_panic_is_caught() {
        let mut surface = PanickingSurface;
        let mut board = board(0);
        let style = CurveStyle::default();

        let result = board
            .record(
                &mut surface,
                "run",
                "loss",
                1.0,
                None,
                false,
                &style,
                Instant::now(),
            )
            .await;

        match result {
            Err(RenderError::Panicked { detail }) => assert!(detail.contains("axes gone")),
            other => panic!("expected caught panic, got {other:?}"),
        }
        // The series itself survived the failed draw.
        assert_eq!(board.live_points("run", "loss").len(), 1);
    }
}
