use halalbot_core::Category;

/// Whether a candidate of `category` survives the requested filter.
/// `None` accepts everything.
pub fn accepts(category: Category, filter: Option<Category>) -> bool {
    filter.map_or(true, |wanted| wanted == category)
}
