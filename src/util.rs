use uuid::Uuid;

/// Time-ordered identifier for new rows.
pub fn generate_id() -> String {
    Uuid::now_v7().to_string()
}

/// URL-safe form of a recipe name. Not guaranteed unique.
pub fn make_slug(name: &str) -> String {
    slug::slugify(name)
}

/// Accepts an id path parameter only when it is a well-formed UUID.
pub fn read_id_param(param: &str) -> Option<&str> {
    Uuid::parse_str(param).ok().map(|_| param)
}
