use serde::Serialize;

#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    #[schema(example = "Fiction")]
    pub name: String,
}

impl From<crate::entity::category::Model> for CategoryResponse {
    fn from(category: crate::entity::category::Model) -> Self {
        Self {
            id: category.id,
            name: category.name,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoryListResponse {
    pub categories: Vec<CategoryResponse>,
    pub total: u64,
}
