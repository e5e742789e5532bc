use serde::Serialize;

#[derive(Serialize)]
pub struct ModelQuery<'a> {
    pub repo: &'a str,
}
