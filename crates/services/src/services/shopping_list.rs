//! Consolidated shopping list for a set of planned recipes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::ingredients::{IngredientCategory, parse_ingredient, split_materials};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListItem {
    pub name: String,
    /// Summed numeric amount, when any line had one.
    pub quantity: Option<f64>,
    pub unit: String,
    /// Amounts that are not numbers (`少々`, `適量`), each kept once.
    pub notes: Vec<String>,
    /// Display form, e.g. `600`, `1.5` or `2 + 少々`.
    pub amount: Option<String>,
    pub category: IngredientCategory,
    /// Titles of the recipes that need this item.
    pub recipes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListGroup {
    pub category: IngredientCategory,
    pub items: Vec<ShoppingListItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    pub items: Vec<ShoppingListItem>,
    pub groups: Vec<ShoppingListGroup>,
    pub recipe_count: usize,
}

/// `500.0` → `500`, `1.5` → `1.5`, `0.3333` → `0.33`.
pub fn format_quantity(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        return format!("{}", value.round() as i64);
    }
    let fixed = format!("{value:.2}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn display_amount(quantity: Option<f64>, notes: &[String]) -> Option<String> {
    let parts: Vec<String> = quantity
        .map(format_quantity)
        .into_iter()
        .chain(notes.iter().cloned())
        .collect();
    (!parts.is_empty()).then(|| parts.join(" + "))
}

/// Merge the materials of `recipes` (title, material lines) into one list.
///
/// Lines with the same name and unit are combined. Numeric amounts are summed;
/// different units stay as separate items.
pub fn generate_shopping_list<'a, I>(recipes: I) -> ShoppingList
where
    I: IntoIterator<Item = (&'a str, &'a [String])>,
{
    let mut items: Vec<ShoppingListItem> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut recipe_count = 0;

    for (title, materials) in recipes {
        recipe_count += 1;
        for line in materials.iter().flat_map(|m| split_materials(m)) {
            let parsed = parse_ingredient(&line);
            if parsed.name.is_empty() {
                continue;
            }
            let quantity = parsed.quantity();
            let key = (parsed.name.clone(), parsed.unit.clone());

            let slot = *index.entry(key).or_insert_with(|| {
                items.push(ShoppingListItem {
                    name: parsed.name.clone(),
                    quantity: None,
                    unit: parsed.unit.clone(),
                    notes: Vec::new(),
                    amount: None,
                    category: parsed.category,
                    recipes: Vec::new(),
                });
                items.len() - 1
            });
            let item = &mut items[slot];

            match (quantity, parsed.amount) {
                (Some(q), _) => item.quantity = Some(item.quantity.unwrap_or(0.0) + q),
                (None, Some(note)) if !item.notes.contains(&note) => item.notes.push(note),
                _ => {}
            }
            if !item.recipes.iter().any(|r| r == title) {
                item.recipes.push(title.to_string());
            }
        }
    }

    for item in &mut items {
        item.amount = display_amount(item.quantity, &item.notes);
    }
    items.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.unit.cmp(&b.unit))
    });

    let mut groups: Vec<ShoppingListGroup> = Vec::new();
    for item in &items {
        match groups.last_mut() {
            Some(group) if group.category == item.category => group.items.push(item.clone()),
            _ => groups.push(ShoppingListGroup {
                category: item.category,
                items: vec![item.clone()],
            }),
        }
    }

    ShoppingList {
        items,
        groups,
        recipe_count,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn same_name_and_unit_are_summed() {
        let curry = lines(&["鶏もも肉 300g", "玉ねぎ 1個"]);
        let teriyaki = lines(&["鶏もも肉 200g", "醤油 大さじ2"]);
        let list = generate_shopping_list([
            ("カレー", curry.as_slice()),
            ("照り焼き", teriyaki.as_slice()),
        ]);

        let chicken = list.items.iter().find(|i| i.name == "鶏もも肉").unwrap();
        assert_eq!(chicken.quantity, Some(500.0));
        assert_eq!(chicken.unit, "g");
        assert_eq!(chicken.amount.as_deref(), Some("500"));
        assert_eq!(chicken.recipes, vec!["カレー", "照り焼き"]);
        assert_eq!(list.recipe_count, 2);
    }

    #[test]
    fn different_units_stay_separate() {
        let a = lines(&["醤油 大さじ1"]);
        let b = lines(&["醤油 小さじ1/2"]);
        let list = generate_shopping_list([("a", a.as_slice()), ("b", b.as_slice())]);

        let soy: Vec<_> = list.items.iter().filter(|i| i.name == "醤油").collect();
        assert_eq!(soy.len(), 2);
        assert_eq!(soy[0].unit, "大さじ");
        assert_eq!(soy[1].unit, "小さじ");
        assert_eq!(soy[1].amount.as_deref(), Some("0.5"));
    }

    #[test]
    fn vague_amounts_are_kept_once() {
        let a = lines(&["塩 少々"]);
        let b = lines(&["塩 少々", "塩 適量"]);
        let list = generate_shopping_list([("a", a.as_slice()), ("b", b.as_slice())]);

        let salt = list.items.iter().find(|i| i.name == "塩").unwrap();
        assert_eq!(salt.quantity, None);
        assert_eq!(salt.notes, vec!["少々", "適量"]);
        assert_eq!(salt.amount.as_deref(), Some("少々 + 適量"));
    }

    #[test]
    fn items_are_grouped_in_category_order() {
        let recipe = lines(&["キャベツ 1/4個", "塩 少々", "豚こま肉 200g", "鮭 2切れ", "卵 2"]);
        let list = generate_shopping_list([("ごちゃまぜ", recipe.as_slice())]);

        let order: Vec<_> = list.groups.iter().map(|g| g.category).collect();
        assert_eq!(
            order,
            vec![
                IngredientCategory::Meat,
                IngredientCategory::Seafood,
                IngredientCategory::Seasoning,
                IngredientCategory::Vegetable,
                IngredientCategory::EggDairy,
            ]
        );
        assert_eq!(list.items.len(), 5);
    }

    #[test]
    fn material_blobs_are_split() {
        let recipe = lines(&["にんじん 1本、じゃがいも 2個"]);
        let list = generate_shopping_list([("肉じゃが", recipe.as_slice())]);
        assert_eq!(list.items.len(), 2);
    }

    #[test]
    fn formats_quantities() {
        assert_eq!(format_quantity(500.0), "500");
        assert_eq!(format_quantity(1.5), "1.5");
        assert_eq!(format_quantity(1.0 / 3.0), "0.33");
    }

    #[test]
    fn empty_input() {
        let list = generate_shopping_list(std::iter::empty());
        assert_eq!(list, ShoppingList::default());
    }
}
