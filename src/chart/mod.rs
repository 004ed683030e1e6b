//! Candlestick chart engine.
//!
//! - `BarManager` holds the ordered bar series
//! - `IndicatorEngine` fills per-bar indicator values, fully or for the last bar
//! - `Viewport` maps bar indices to pixels and owns scroll, zoom and selection
//! - `PaneLayout` splits the surface into the price pane and indicator panes
//! - `ChartPainter` composes a `Frame` of draw commands
//! - `InteractionController` turns gestures into viewport changes
//! - `ChartView` ties them together; `ChartWidget` hosts it in egui
//!
//! # Example
//!
//! ```ignore
//! use kline_chart::chart::{ChartView, ChartWidget};
//!
//! let mut view = ChartView::default();
//! view.set_history(bars);
//! let feed = view.attach_feed();
//! let mut widget = ChartWidget::new(view);
//! // inside an egui frame
//! widget.show(ui);
//! ```

pub mod base;
pub mod feed;
pub mod frame;
pub mod indicator;
pub mod interaction;
pub mod item;
pub mod layout;
pub mod manager;
pub mod object;
pub mod painter;
pub mod style;
pub mod view;
pub mod viewport;
pub mod widget;

pub use feed::{BarFeed, FeedEvent};
pub use frame::{DrawCommand, FixedAdvance, Frame, Layer, TextMeasure};
pub use indicator::{IndicatorEngine, KdjParams, MacdParams, MainIndicator, SecondaryIndicator, SecondarySet};
pub use interaction::{GestureEvent, GestureOutcome, InertiaConfig, InteractionController, InteractionState};
pub use layout::PaneLayout;
pub use manager::{BarManager, BarUpdate};
pub use object::{Bar, IndicatorValues};
pub use painter::ChartPainter;
pub use style::{ChartStyle, InfoPanelLocale, InfoPanelTexts, NumberFormat};
pub use view::ChartView;
pub use viewport::{Viewport, ViewportState, VisibleRange};
pub use widget::{install_cjk_fonts, ChartWidget, EguiMeasure};
