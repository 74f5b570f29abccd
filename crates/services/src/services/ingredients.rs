//! Parsing of free-text ingredient lines such as `鶏もも肉 500g` or `塩 少々`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter};
use ts_rs::TS;
use utils::text::normalize_width;

/// Shopping-list sections. Variant order is both the keyword check order and the display order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    TS,
    EnumIter,
    Display,
    AsRefStr,
)]
pub enum IngredientCategory {
    #[serde(rename = "肉類")]
    #[strum(serialize = "肉類")]
    Meat,
    #[serde(rename = "魚介類")]
    #[strum(serialize = "魚介類")]
    Seafood,
    #[serde(rename = "調味料")]
    #[strum(serialize = "調味料")]
    Seasoning,
    #[serde(rename = "野菜")]
    #[strum(serialize = "野菜")]
    Vegetable,
    #[serde(rename = "卵・乳製品")]
    #[strum(serialize = "卵・乳製品")]
    EggDairy,
    #[serde(rename = "穀物・麺類")]
    #[strum(serialize = "穀物・麺類")]
    GrainNoodle,
    #[serde(rename = "果物")]
    #[strum(serialize = "果物")]
    Fruit,
    #[serde(rename = "その他")]
    #[strum(serialize = "その他")]
    Other,
}

// Bare 牛/鶏 would swallow 牛乳 and 鶏卵, so meat keywords are cut-specific.
const MEAT: &[&str] = &[
    "肉", "鶏もも", "鶏むね", "ささみ", "手羽", "豚", "牛こま", "牛バラ", "牛ロース", "ベーコン",
    "ハム", "ソーセージ", "ウインナー", "チャーシュー",
];
const SEAFOOD: &[&str] = &[
    "魚", "鮭", "さけ", "サーモン", "まぐろ", "マグロ", "鯖", "さば", "サバ", "ぶり", "鯛", "たら",
    "えび", "エビ", "海老", "いか", "イカ", "たこ", "タコ", "あさり", "しじみ", "ほたて", "帆立",
    "かに", "ツナ", "しらす", "ちくわ", "かまぼこ", "わかめ", "昆布",
];
const SEASONING: &[&str] = &[
    "醤油", "しょうゆ", "塩", "砂糖", "みりん", "酒", "酢", "味噌", "みそ", "油", "マヨネーズ",
    "ケチャップ", "ソース", "こしょう", "胡椒", "コショウ", "だし", "コンソメ", "鶏がら", "片栗粉",
    "めんつゆ", "ポン酢", "豆板醤", "オイスター", "はちみつ", "スパイス", "カレー粉", "カレールー",
];
const VEGETABLE: &[&str] = &[
    "野菜", "玉ねぎ", "たまねぎ", "玉葱", "にんじん", "人参", "じゃがいも", "キャベツ", "レタス",
    "トマト", "きゅうり", "なす", "ピーマン", "パプリカ", "ねぎ", "ネギ", "ほうれん草", "小松菜",
    "白菜", "大根", "ごぼう", "れんこん", "もやし", "ブロッコリー", "しめじ", "えのき", "しいたけ",
    "まいたけ", "きのこ", "にんにく", "しょうが", "生姜", "かぼちゃ", "アスパラ", "豆苗", "ニラ",
    "にら", "オクラ", "セロリ", "水菜", "大葉", "さつまいも", "里芋",
];
const EGG_DAIRY: &[&str] = &[
    "卵", "たまご", "玉子", "牛乳", "ミルク", "チーズ", "バター", "生クリーム", "ヨーグルト",
];
const GRAIN_NOODLE: &[&str] = &[
    "米", "ご飯", "ごはん", "パン", "小麦粉", "薄力粉", "強力粉", "うどん", "そば", "そうめん",
    "パスタ", "スパゲッティ", "マカロニ", "麺", "ラーメン", "餅",
];
const FRUIT: &[&str] = &[
    "果物", "りんご", "バナナ", "レモン", "みかん", "オレンジ", "いちご", "ぶどう", "キウイ",
    "パイナップル", "ゆず",
];

impl IngredientCategory {
    fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Meat => MEAT,
            Self::Seafood => SEAFOOD,
            Self::Seasoning => SEASONING,
            Self::Vegetable => VEGETABLE,
            Self::EggDairy => EGG_DAIRY,
            Self::GrainNoodle => GRAIN_NOODLE,
            Self::Fruit => FRUIT,
            Self::Other => &[],
        }
    }
}

/// First category whose keyword list has a substring of `name`.
pub fn categorize(name: &str) -> IngredientCategory {
    use strum::IntoEnumIterator;

    IngredientCategory::iter()
        .find(|category| category.keywords().iter().any(|kw| name.contains(kw)))
        .unwrap_or(IngredientCategory::Other)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ParsedIngredient {
    pub name: String,
    /// Amount as written, e.g. `500`, `1/2` or `少々`.
    pub amount: Option<String>,
    pub unit: String,
    pub category: IngredientCategory,
}

impl ParsedIngredient {
    /// Numeric value of `amount`, if it has one.
    pub fn quantity(&self) -> Option<f64> {
        self.amount.as_deref().and_then(parse_amount)
    }
}

const NUMBER: &str = r"\d+(?:と\d+/\d+|[./]\d+)?";

static BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\s・\-*●○◎☆★■□◆◇※]+").expect("bullet pattern"));
static BRACKETED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[（(【\[「〔][^）)】\]」〕]*[）)】\]」〕]").expect("bracket pattern")
});
static SPOON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(大さじ|小さじ|カップ)\s*({NUMBER})")).expect("spoon pattern")
});
static NUMBER_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)({NUMBER})\s*(kg|mg|ml|g|l|cc|個|本|枚|切れ|片|株|束|袋|缶|パック|合|玉|丁|尾|匹|杯|房|箱|かけ|粒)"
    ))
    .expect("unit pattern")
});
// The name must end in a non-digit so `卵12` keeps its whole count.
static TRAILING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^(.*?\D)\s*({NUMBER})\s*$")).expect("trailing number pattern")
});
static VAGUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(適量|少々|適宜|お好みで|お好み|ひとつまみ|少量)").expect("vague pattern")
});

/// Split a recipe's materials blob into individual lines.
pub fn split_materials(text: &str) -> Vec<String> {
    text.split(['\n', '\r', '、', ',', '，', ';', '；'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `"1/2"` → 0.5, `"1と1/2"` → 1.5, `"2.5"` → 2.5. Words such as `少々` yield `None`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if let Some((whole, fraction)) = raw.split_once('と') {
        return Some(whole.parse::<f64>().ok()? + parse_amount(fraction)?);
    }
    if let Some((num, den)) = raw.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        return (den != 0.0).then(|| num / den);
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn clean_name(text: &str) -> String {
    text.trim_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '：' | '…' | '・' | '.'))
        .to_string()
}

/// Split one ingredient line into name, amount and unit, and categorize it.
pub fn parse_ingredient(raw: &str) -> ParsedIngredient {
    let normalized = normalize_width(raw);
    let without_bullet = BULLET.replace(&normalized, "");
    let text = BRACKETED.replace_all(&without_bullet, " ");
    let text = text.trim();

    let (name, amount, unit) = if let Some(caps) = SPOON.captures(text) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        (
            format!("{}{}", &text[..whole.start], &text[whole.end..]),
            Some(caps[2].to_string()),
            caps[1].to_string(),
        )
    } else if let Some(caps) = NUMBER_UNIT.captures(text) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        (
            format!("{}{}", &text[..whole.start], &text[whole.end..]),
            Some(caps[1].to_string()),
            caps[2].to_lowercase(),
        )
    } else if let Some(caps) = TRAILING_NUMBER.captures(text) {
        (caps[1].to_string(), Some(caps[2].to_string()), String::new())
    } else if let Some(m) = VAGUE.find(text) {
        (
            format!("{}{}", &text[..m.start()], &text[m.end()..]),
            Some(m.as_str().to_string()),
            String::new(),
        )
    } else {
        (text.to_string(), None, String::new())
    };

    let mut name = clean_name(&name);
    if name.is_empty() {
        name = clean_name(text);
    }
    let category = categorize(&name);

    ParsedIngredient {
        name,
        amount,
        unit,
        category,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn parsed(name: &str, amount: Option<&str>, unit: &str, category: IngredientCategory) -> ParsedIngredient {
        ParsedIngredient {
            name: name.to_string(),
            amount: amount.map(str::to_string),
            unit: unit.to_string(),
            category,
        }
    }

    #[test]
    fn parses_weight() {
        assert_eq!(
            parse_ingredient("鶏もも肉 500g"),
            parsed("鶏もも肉", Some("500"), "g", IngredientCategory::Meat)
        );
    }

    #[rstest]
    #[case("醤油 大さじ2", parsed("醤油", Some("2"), "大さじ", IngredientCategory::Seasoning))]
    #[case("砂糖　小さじ１/２", parsed("砂糖", Some("1/2"), "小さじ", IngredientCategory::Seasoning))]
    #[case("・玉ねぎ 1個", parsed("玉ねぎ", Some("1"), "個", IngredientCategory::Vegetable))]
    #[case("塩 少々", parsed("塩", Some("少々"), "", IngredientCategory::Seasoning))]
    #[case("卵 2", parsed("卵", Some("2"), "", IngredientCategory::EggDairy))]
    #[case("卵2", parsed("卵", Some("2"), "", IngredientCategory::EggDairy))]
    #[case("卵12", parsed("卵", Some("12"), "", IngredientCategory::EggDairy))]
    #[case("カレールー 1/2箱", parsed("カレールー", Some("1/2"), "箱", IngredientCategory::Seasoning))]
    #[case("牛乳 200ml", parsed("牛乳", Some("200"), "ml", IngredientCategory::EggDairy))]
    #[case("豚バラ肉（薄切り） 200g", parsed("豚バラ肉", Some("200"), "g", IngredientCategory::Meat))]
    #[case("鮭：2切れ", parsed("鮭", Some("2"), "切れ", IngredientCategory::Seafood))]
    #[case("パセリ", parsed("パセリ", None, "", IngredientCategory::Other))]
    fn parses_common_lines(#[case] raw: &str, #[case] expected: ParsedIngredient) {
        assert_eq!(parse_ingredient(raw), expected);
    }

    #[rstest]
    #[case("うどん", IngredientCategory::GrainNoodle)]
    #[case("レモン汁", IngredientCategory::Fruit)]
    #[case("ポン酢", IngredientCategory::Seasoning)]
    #[case("しめじ", IngredientCategory::Vegetable)]
    #[case("謎の食材", IngredientCategory::Other)]
    fn categorizes_by_keyword(#[case] name: &str, #[case] expected: IngredientCategory) {
        assert_eq!(categorize(name), expected);
    }

    #[rstest]
    #[case("500", Some(500.0))]
    #[case("1/2", Some(0.5))]
    #[case("1と1/2", Some(1.5))]
    #[case("2.5", Some(2.5))]
    #[case("少々", None)]
    #[case("1/0", None)]
    fn amounts(#[case] raw: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_amount(raw), expected);
    }

    #[test]
    fn splits_materials_on_separators() {
        assert_eq!(
            split_materials("鶏もも肉 500g、玉ねぎ 1個\n\n塩 少々；こしょう,"),
            vec!["鶏もも肉 500g", "玉ねぎ 1個", "塩 少々", "こしょう"]
        );
    }

    #[test]
    fn category_labels_are_japanese() {
        assert_eq!(IngredientCategory::EggDairy.to_string(), "卵・乳製品");
        assert_eq!(
            serde_json::to_string(&IngredientCategory::Meat).unwrap(),
            "\"肉類\""
        );
    }
}
