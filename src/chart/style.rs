//! Chart style, theme presets, localized info-panel labels and number
//! formatting callbacks.
//!
//! A [`ChartStyle`] is an immutable-per-frame value passed to layout and
//! painting. Colors serialize as RGBA `[u8; 4]`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use egui::Color32;
use serde::{Deserialize, Serialize};

use super::base::{
    format_price, format_volume, BAR_WIDTH, BOTTOM_DATE_HEIGHT, CANDLE_LINE_WIDTH, CANDLE_WIDTH,
    CHILD_PADDING, CONTENT_PADDING, DASH_SPACE, DASH_WIDTH, MAIN_FLOOR_RATIO, MAX_SCALE, MIN_SCALE,
    POINT_WIDTH, RIGHT_MARGIN_RATIO, SECONDARY_PANE_RATIO, TEXT_SIZE, TOP_PADDING,
};

const UP_GREEN: Color32 = Color32::from_rgb(51, 213, 135);
const DOWN_RED: Color32 = Color32::from_rgb(245, 71, 94);
const YELLOW: Color32 = Color32::from_rgb(255, 204, 0);
const PURPLE: Color32 = Color32::from_rgb(204, 0, 204);
const PINK: Color32 = Color32::from_rgb(255, 102, 204);
const SLATE: Color32 = Color32::from_rgb(96, 115, 142);
const MARKER_BORDER: Color32 = Color32::from_rgb(108, 122, 134);

mod color_serde {
    use egui::Color32;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(color: &Color32, serializer: S) -> Result<S::Ok, S::Error> {
        color.to_srgba_unmultiplied().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Color32, D::Error> {
        let [r, g, b, a] = <[u8; 4]>::deserialize(deserializer)?;
        Ok(Color32::from_rgba_unmultiplied(r, g, b, a))
    }
}

mod color_map_serde {
    use std::collections::BTreeMap;

    use egui::Color32;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        colors: &BTreeMap<usize, Color32>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        colors
            .iter()
            .map(|(period, color)| (*period, color.to_srgba_unmultiplied()))
            .collect::<BTreeMap<usize, [u8; 4]>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<usize, Color32>, D::Error> {
        let raw = BTreeMap::<usize, [u8; 4]>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(period, [r, g, b, a])| (period, Color32::from_rgba_unmultiplied(r, g, b, a)))
            .collect())
    }
}

/// Sizes, paddings and layout policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryStyle {
    /// Horizontal content-space width of one bar slot
    pub point_width: f32,
    pub candle_width: f32,
    pub candle_line_width: f32,
    pub volume_bar_width: f32,
    pub macd_bar_width: f32,
    pub line_width: f32,
    pub top_padding: f32,
    pub bottom_date_height: f32,
    pub child_padding: f32,
    pub text_size: f32,
    /// Vertical breathing room added to the main pane value range
    pub content_padding: f32,
    pub dash_width: f32,
    pub dash_space: f32,
    pub show_dash_line: bool,
    pub secondary_pane_ratio: f32,
    pub main_floor_ratio: f32,
    pub right_margin_ratio: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub grid_rows: usize,
    pub grid_columns: usize,
}

impl Default for GeometryStyle {
    fn default() -> Self {
        Self {
            point_width: POINT_WIDTH,
            candle_width: CANDLE_WIDTH,
            candle_line_width: CANDLE_LINE_WIDTH,
            volume_bar_width: BAR_WIDTH,
            macd_bar_width: BAR_WIDTH,
            line_width: 1.0,
            top_padding: TOP_PADDING,
            bottom_date_height: BOTTOM_DATE_HEIGHT,
            child_padding: CHILD_PADDING,
            text_size: TEXT_SIZE,
            content_padding: CONTENT_PADDING,
            dash_width: DASH_WIDTH,
            dash_space: DASH_SPACE,
            show_dash_line: true,
            secondary_pane_ratio: SECONDARY_PANE_RATIO,
            main_floor_ratio: MAIN_FLOOR_RATIO,
            right_margin_ratio: RIGHT_MARGIN_RATIO,
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            grid_rows: 2,
            grid_columns: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandleStyle {
    #[serde(with = "color_serde")]
    pub up_color: Color32,
    #[serde(with = "color_serde")]
    pub down_color: Color32,
    /// Filled bodies when true, outlined otherwise
    pub solid: bool,
}

impl Default for CandleStyle {
    fn default() -> Self {
        Self {
            up_color: UP_GREEN,
            down_color: DOWN_RED,
            solid: true,
        }
    }
}

/// Per-period line colors with positional fallbacks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodColors {
    #[serde(with = "color_map_serde")]
    pub colors: BTreeMap<usize, Color32>,
    #[serde(with = "color_serde")]
    pub first: Color32,
    #[serde(with = "color_serde")]
    pub second: Color32,
    #[serde(with = "color_serde")]
    pub third: Color32,
}

impl PeriodColors {
    fn with(entries: &[(usize, Color32)]) -> Self {
        Self {
            colors: entries.iter().copied().collect(),
            ..Default::default()
        }
    }

    /// Color for `period`, falling back to the color of its slot
    pub fn color_for(&self, period: usize, slot: usize) -> Color32 {
        if let Some(color) = self.colors.get(&period) {
            return *color;
        }
        match slot % 3 {
            0 => self.first,
            1 => self.second,
            _ => self.third,
        }
    }
}

impl Default for PeriodColors {
    fn default() -> Self {
        Self {
            colors: BTreeMap::new(),
            first: YELLOW,
            second: PURPLE,
            third: Color32::from_rgb(0, 128, 255),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BollStyle {
    #[serde(with = "color_serde")]
    pub upper: Color32,
    #[serde(with = "color_serde")]
    pub middle: Color32,
    #[serde(with = "color_serde")]
    pub lower: Color32,
}

impl Default for BollStyle {
    fn default() -> Self {
        Self {
            upper: YELLOW,
            middle: PURPLE,
            lower: YELLOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdStyle {
    #[serde(with = "color_serde")]
    pub dif: Color32,
    #[serde(with = "color_serde")]
    pub dea: Color32,
    #[serde(with = "color_serde")]
    pub positive: Color32,
    #[serde(with = "color_serde")]
    pub negative: Color32,
}

impl Default for MacdStyle {
    fn default() -> Self {
        Self {
            dif: YELLOW,
            dea: PURPLE,
            positive: UP_GREEN,
            negative: DOWN_RED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdjStyle {
    #[serde(with = "color_serde")]
    pub k: Color32,
    #[serde(with = "color_serde")]
    pub d: Color32,
    #[serde(with = "color_serde")]
    pub j: Color32,
}

impl Default for KdjStyle {
    fn default() -> Self {
        Self {
            k: PURPLE,
            d: YELLOW,
            j: PINK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeStyle {
    #[serde(with = "color_serde")]
    pub up_color: Color32,
    #[serde(with = "color_serde")]
    pub down_color: Color32,
    #[serde(with = "color_serde")]
    pub text_color: Color32,
    pub ma: PeriodColors,
}

impl Default for VolumeStyle {
    fn default() -> Self {
        Self {
            up_color: UP_GREEN,
            down_color: DOWN_RED,
            text_color: SLATE,
            ma: PeriodColors::with(&[(5, YELLOW), (10, PURPLE)]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundStyle {
    #[serde(with = "color_serde")]
    pub background: Color32,
    #[serde(with = "color_serde")]
    pub grid: Color32,
    pub grid_line_width: f32,
}

impl Default for BackgroundStyle {
    fn default() -> Self {
        Self {
            background: Color32::WHITE,
            grid: Color32::from_rgb(230, 230, 230),
            grid_line_width: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    #[serde(with = "color_serde")]
    pub text: Color32,
    #[serde(with = "color_serde")]
    pub price_text: Color32,
    #[serde(with = "color_serde")]
    pub time_text: Color32,
    #[serde(with = "color_serde")]
    pub max_min_text: Color32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            text: SLATE,
            price_text: SLATE,
            time_text: SLATE,
            max_min_text: Color32::from_rgb(64, 64, 64),
        }
    }
}

/// Live (last close) price marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealTimeStyle {
    #[serde(with = "color_serde")]
    pub line: Color32,
    #[serde(with = "color_serde")]
    pub long_line: Color32,
    #[serde(with = "color_serde")]
    pub box_background: Color32,
    #[serde(with = "color_serde")]
    pub box_border: Color32,
    #[serde(with = "color_serde")]
    pub text: Color32,
    #[serde(with = "color_serde")]
    pub triangle: Color32,
}

impl Default for RealTimeStyle {
    fn default() -> Self {
        Self {
            line: Color32::from_rgb(56, 229, 204),
            long_line: Color32::from_rgb(56, 229, 204),
            box_background: Color32::WHITE,
            box_border: MARKER_BORDER,
            text: Color32::BLACK,
            triangle: Color32::BLACK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrosshairStyle {
    #[serde(with = "color_serde")]
    pub line: Color32,
    #[serde(with = "color_serde")]
    pub point: Color32,
    #[serde(with = "color_serde")]
    pub marker_background: Color32,
    #[serde(with = "color_serde")]
    pub marker_border: Color32,
    #[serde(with = "color_serde")]
    pub marker_text: Color32,
    pub vertical_width: f32,
    pub horizontal_width: f32,
}

impl Default for CrosshairStyle {
    fn default() -> Self {
        Self {
            line: Color32::from_rgba_unmultiplied(96, 115, 142, 160),
            point: Color32::from_rgb(96, 115, 142),
            marker_background: Color32::from_rgb(35, 41, 56),
            marker_border: MARKER_BORDER,
            marker_text: Color32::WHITE,
            vertical_width: 1.0,
            horizontal_width: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoPanelStyle {
    #[serde(with = "color_serde")]
    pub background: Color32,
    #[serde(with = "color_serde")]
    pub text: Color32,
    #[serde(with = "color_serde")]
    pub border: Color32,
    pub corner_radius: f32,
}

impl Default for InfoPanelStyle {
    fn default() -> Self {
        Self {
            background: Color32::from_rgba_unmultiplied(242, 242, 242, 230),
            text: Color32::BLACK,
            border: MARKER_BORDER,
            corner_radius: 8.0,
        }
    }
}

/// Time-share (line mode) colors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineChartStyle {
    #[serde(with = "color_serde")]
    pub line: Color32,
    #[serde(with = "color_serde")]
    pub shadow_top: Color32,
    #[serde(with = "color_serde")]
    pub shadow_bottom: Color32,
    pub width: f32,
}

impl Default for LineChartStyle {
    fn default() -> Self {
        Self {
            line: Color32::from_rgb(73, 133, 240),
            shadow_top: Color32::from_rgba_unmultiplied(73, 133, 240, 90),
            shadow_bottom: Color32::from_rgba_unmultiplied(73, 133, 240, 0),
            width: 1.0,
        }
    }
}

/// Info panel presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InfoPanelLocale {
    #[default]
    ZhHans,
    ZhHant,
    En,
    Ja,
    Ko,
}

/// Row labels of the crosshair info panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoPanelTexts {
    pub time: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub change: String,
    pub amplitude: String,
    pub volume: String,
    pub amount: String,
}

impl InfoPanelTexts {
    pub fn preset(locale: InfoPanelLocale) -> Self {
        let labels: [&str; 9] = match locale {
            InfoPanelLocale::ZhHans => ["时间", "开", "高", "低", "收", "涨幅", "振幅", "量", "额"],
            InfoPanelLocale::ZhHant => ["時間", "開", "高", "低", "收", "漲幅", "振幅", "量", "額"],
            InfoPanelLocale::En => [
                "Time", "Open", "High", "Low", "Close", "Change", "Amplitude", "Vol", "Amount",
            ],
            InfoPanelLocale::Ja => [
                "時間", "始値", "高値", "安値", "終値", "騰落", "変動幅", "出来高", "金額",
            ],
            InfoPanelLocale::Ko => [
                "시간", "시가", "고가", "저가", "종가", "등락", "변동폭", "거래량", "거래대금",
            ],
        };
        let [time, open, high, low, close, change, amplitude, volume, amount] = labels.map(String::from);
        Self {
            time,
            open,
            high,
            low,
            close,
            change,
            amplitude,
            volume,
            amount,
        }
    }
}

impl Default for InfoPanelTexts {
    fn default() -> Self {
        Self::preset(InfoPanelLocale::ZhHans)
    }
}

/// Every style record the painter consumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartStyle {
    pub geometry: GeometryStyle,
    pub candle: CandleStyle,
    pub ma: PeriodColors,
    pub ema: PeriodColors,
    pub boll: BollStyle,
    pub macd: MacdStyle,
    pub kdj: KdjStyle,
    pub rsi: PeriodColors,
    #[serde(with = "color_serde")]
    pub wr: Color32,
    pub volume: VolumeStyle,
    pub background: BackgroundStyle,
    pub text: TextStyle,
    pub real_time: RealTimeStyle,
    pub crosshair: CrosshairStyle,
    pub info_panel: InfoPanelStyle,
    pub line_chart: LineChartStyle,
    pub info_texts: InfoPanelTexts,
    /// Decimals for prices and indicator values
    pub fraction_digits: usize,
    /// Offset applied when rendering bar timestamps
    pub utc_offset_minutes: i32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self::light()
    }
}

impl ChartStyle {
    pub fn light() -> Self {
        Self {
            geometry: GeometryStyle::default(),
            candle: CandleStyle::default(),
            ma: PeriodColors::with(&[
                (5, YELLOW),
                (10, PURPLE),
                (20, Color32::from_rgb(0, 128, 255)),
                (30, Color32::from_rgb(128, 0, 128)),
                (60, Color32::from_rgb(128, 0, 128)),
            ]),
            ema: PeriodColors::with(&[
                (5, Color32::from_rgb(242, 140, 38)),
                (10, Color32::from_rgb(51, 166, 217)),
                (12, Color32::from_rgb(230, 64, 64)),
                (20, Color32::from_rgb(64, 204, 115)),
                (26, Color32::from_rgb(140, 89, 204)),
                (30, Color32::from_rgb(26, 115, 230)),
                (60, Color32::from_rgb(89, 89, 89)),
            ]),
            boll: BollStyle::default(),
            macd: MacdStyle::default(),
            kdj: KdjStyle::default(),
            rsi: PeriodColors::with(&[(6, YELLOW), (12, PINK), (24, PURPLE)]),
            wr: YELLOW,
            volume: VolumeStyle::default(),
            background: BackgroundStyle::default(),
            text: TextStyle::default(),
            real_time: RealTimeStyle::default(),
            crosshair: CrosshairStyle::default(),
            info_panel: InfoPanelStyle::default(),
            line_chart: LineChartStyle::default(),
            info_texts: InfoPanelTexts::default(),
            fraction_digits: 2,
            utc_offset_minutes: 0,
        }
    }

    pub fn dark() -> Self {
        let mut style = Self::light();
        style.background.background = Color32::from_rgb(19, 23, 35);
        style.background.grid = Color32::from_rgb(77, 77, 77);
        style.text.text = Color32::WHITE;
        style.text.price_text = Color32::WHITE;
        style.text.time_text = Color32::WHITE;
        style.text.max_min_text = Color32::from_rgb(200, 200, 200);
        style.real_time.box_background = Color32::from_rgb(35, 41, 56);
        style.real_time.text = Color32::WHITE;
        style.real_time.triangle = Color32::WHITE;
        style.info_panel.background = Color32::from_rgba_unmultiplied(35, 41, 56, 230);
        style.info_panel.text = Color32::WHITE;
        style
    }

    pub fn binance() -> Self {
        let mut style = Self::light();
        style.candle = CandleStyle::default();
        style.macd = MacdStyle::default();
        style.kdj = KdjStyle::default();
        style.volume = VolumeStyle::default();
        style.wr = YELLOW;
        style.text.text = SLATE;
        style.text.price_text = SLATE;
        style.text.time_text = SLATE;
        style
    }

    pub fn with_locale(mut self, locale: InfoPanelLocale) -> Self {
        self.info_texts = InfoPanelTexts::preset(locale);
        self
    }
}

pub type FormatFn = Arc<dyn Fn(f64) -> String + Send + Sync>;

/// Price and volume formatting callbacks
#[derive(Clone)]
pub struct NumberFormat {
    price: FormatFn,
    volume: FormatFn,
}

impl NumberFormat {
    /// Grouped fixed-fraction prices and k/M/B/T volumes
    pub fn new(fraction_digits: usize) -> Self {
        Self {
            price: Arc::new(move |v| format_price(v, fraction_digits)),
            volume: Arc::new(move |v| format_volume(v, fraction_digits)),
        }
    }

    pub fn with_price(mut self, f: impl Fn(f64) -> String + Send + Sync + 'static) -> Self {
        self.price = Arc::new(f);
        self
    }

    pub fn with_volume(mut self, f: impl Fn(f64) -> String + Send + Sync + 'static) -> Self {
        self.volume = Arc::new(f);
        self
    }

    pub fn price(&self, value: f64) -> String {
        (self.price)(value)
    }

    pub fn volume(&self, value: f64) -> String {
        (self.volume)(value)
    }
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self::new(2)
    }
}

impl fmt::Debug for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumberFormat").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_color_fallback() {
        let style = ChartStyle::default();
        assert_eq!(style.ma.color_for(5, 2), YELLOW);
        assert_eq!(style.ma.color_for(7, 1), style.ma.second);
        assert_eq!(style.rsi.color_for(14, 0), style.rsi.first);
    }

    #[test]
    fn test_locale_presets() {
        assert_eq!(InfoPanelTexts::preset(InfoPanelLocale::En).volume, "Vol");
        assert_eq!(InfoPanelTexts::preset(InfoPanelLocale::Ko).amount, "거래대금");
        let style = ChartStyle::dark().with_locale(InfoPanelLocale::Ja);
        assert_eq!(style.info_texts.open, "始値");
        assert_ne!(style.background.background, ChartStyle::light().background.background);
    }

    #[test]
    fn test_style_json_round_trip_and_partial() {
        let style = ChartStyle::dark();
        let json = serde_json::to_string(&style).unwrap();
        let back: ChartStyle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, style);

        let partial: ChartStyle =
            serde_json::from_str(r#"{"wr":[1,2,3,255],"geometry":{"grid_rows":4}}"#).unwrap();
        assert_eq!(partial.wr, Color32::from_rgb(1, 2, 3));
        assert_eq!(partial.geometry.grid_rows, 4);
        assert_eq!(partial.geometry.point_width, POINT_WIDTH);
    }

    #[test]
    fn test_number_format_callbacks() {
        let fmt = NumberFormat::default();
        assert_eq!(fmt.price(1234.5), "1,234.50");
        assert_eq!(fmt.volume(1500.0), "1.5k");

        let custom = NumberFormat::new(4).with_price(|v| format!("${:.1}", v));
        assert_eq!(custom.price(2.0), "$2.0");
        assert_eq!(custom.volume(0.5), "0.5");
    }
}
