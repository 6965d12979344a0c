// src/models/catalog.rs

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::common::db_utils::Pagination;

/// Alíquotas de GST aceitas no cadastro de produtos.
pub const GST_RATES: [u32; 5] = [0, 5, 12, 18, 28];

pub fn is_valid_gst_rate(rate: Decimal) -> bool {
    GST_RATES.iter().any(|r| Decimal::from(*r) == rate)
}

// Soft delete: nunca apagamos registros referenciados por vendas
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "record_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Inactive,
}

// --- 1. Categorias ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Categoria com a contagem de produtos ativos (listagem)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CategoryWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub category: Category,
    pub parent_name: Option<String>,
    pub product_count: i64,
}

// Categoria com as subcategorias diretas (detalhe)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: CategoryWithCount,
    pub subcategories: Vec<Category>,
}

// Nó da árvore de categorias
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    #[schema(no_recursion)]
    pub children: Vec<CategoryNode>,
}

/// Monta a árvore a partir da lista plana. Categorias cujo pai não está na
/// lista (pai inativo) sobem para a raiz.
pub fn build_category_tree(categories: Vec<Category>) -> Vec<CategoryNode> {
    let ids: HashSet<Uuid> = categories.iter().map(|c| c.id).collect();
    let mut by_parent: HashMap<Option<Uuid>, Vec<Category>> = HashMap::new();

    for category in categories {
        let parent = category.parent_id.filter(|p| ids.contains(p));
        by_parent.entry(parent).or_default().push(category);
    }

    fn attach(
        parent: Option<Uuid>,
        by_parent: &mut HashMap<Option<Uuid>, Vec<Category>>,
    ) -> Vec<CategoryNode> {
        let mut level = by_parent.remove(&parent).unwrap_or_default();
        level.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        level
            .into_iter()
            .map(|category| {
                let children = attach(Some(category.id), by_parent);
                CategoryNode { category, children }
            })
            .collect()
    }

    attach(None, &mut by_parent)
}

/// Verdadeiro quando mover `category_id` para baixo de `new_parent` criaria um ciclo.
/// `parents` mapeia id -> parent_id de todas as categorias conhecidas.
pub fn creates_cycle(
    parents: &HashMap<Uuid, Option<Uuid>>,
    category_id: Uuid,
    new_parent: Uuid,
) -> bool {
    let mut current = Some(new_parent);
    let mut visited = HashSet::new();
    while let Some(id) = current {
        if id == category_id || !visited.insert(id) {
            return true;
        }
        current = parents.get(&id).copied().flatten();
    }
    false
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryPayload {
    #[validate(length(min = 1, max = 100, message = "O nome deve ter entre 1 e 100 caracteres."))]
    #[schema(example = "Bebidas")]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryPayload {
    #[validate(length(min = 1, max = 100, message = "O nome deve ter entre 1 e 100 caracteres."))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    // Quando true, a categoria passa a ser raiz (ignora parent_id)
    #[serde(default)]
    pub move_to_root: bool,
}

// --- 2. Produtos ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub sku: String,
    pub barcode: Option<String>,
    pub category_id: Option<Uuid>,
    #[schema(value_type = f64, example = 80.0)]
    pub purchase_price: Decimal,
    #[schema(value_type = f64, example = 100.0)]
    pub selling_price: Decimal,
    #[schema(value_type = f64, example = 18.0)]
    pub gst_rate: Decimal,
    pub unit: String,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Produto + saldo de estoque + nome da categoria
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ProductWithStock {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub product: Product,
    pub category_name: Option<String>,
    pub current_quantity: i32,
    pub minimum_threshold: i32,
    pub maximum_capacity: Option<i32>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ProductFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Busca em nome, SKU e código de barras
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
}

fn validate_money(value: Decimal, field: &'static str, errors: &mut ValidationErrors) {
    if value.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.message = Some("O valor não pode ser negativo.".into());
        errors.add(field, err);
    }
}

fn validate_gst(rate: Decimal, errors: &mut ValidationErrors) {
    if !is_valid_gst_rate(rate) {
        let mut err = ValidationError::new("gst_rate");
        err.message = Some("A alíquota de GST deve ser 0, 5, 12, 18 ou 28.".into());
        errors.add("gst_rate", err);
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductPayload {
    #[validate(length(min = 1, max = 200, message = "O nome é obrigatório (máx. 200)."))]
    #[schema(example = "Arroz 5kg")]
    pub name: String,

    pub description: Option<String>,

    #[validate(length(min = 1, max = 50, message = "O SKU é obrigatório (máx. 50)."))]
    #[schema(example = "ARZ-5KG")]
    pub sku: String,

    #[validate(length(min = 1, max = 50, message = "Código de barras inválido (máx. 50)."))]
    pub barcode: Option<String>,

    pub category_id: Option<Uuid>,

    #[schema(value_type = f64)]
    pub purchase_price: Decimal,

    #[schema(value_type = f64)]
    pub selling_price: Decimal,

    #[serde(default)]
    #[schema(value_type = f64)]
    pub gst_rate: Decimal,

    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,

    #[validate(range(min = 0, message = "O estoque inicial não pode ser negativo."))]
    pub initial_stock: Option<i32>,

    #[validate(range(min = 0, message = "O estoque mínimo não pode ser negativo."))]
    pub minimum_threshold: Option<i32>,

    #[validate(range(min = 0, message = "A capacidade máxima não pode ser negativa."))]
    pub maximum_capacity: Option<i32>,
}

impl CreateProductPayload {
    // Regras que o derive não cobre (Decimal e alíquotas)
    pub fn validate_business_rules(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_money(self.purchase_price, "purchase_price", &mut errors);
        validate_money(self.selling_price, "selling_price", &mut errors);
        validate_gst(self.gst_rate, &mut errors);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductPayload {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub sku: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub barcode: Option<String>,
    pub category_id: Option<Uuid>,
    #[schema(value_type = Option<f64>)]
    pub purchase_price: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub selling_price: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub gst_rate: Option<Decimal>,
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
}

impl UpdateProductPayload {
    pub fn validate_business_rules(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(price) = self.purchase_price {
            validate_money(price, "purchase_price", &mut errors);
        }
        if let Some(price) = self.selling_price {
            validate_money(price, "selling_price", &mut errors);
        }
        if let Some(rate) = self.gst_rate {
            validate_gst(rate, &mut errors);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.sku.is_none()
            && self.barcode.is_none()
            && self.category_id.is_none()
            && self.purchase_price.is_none()
            && self.selling_price.is_none()
            && self.gst_rate.is_none()
            && self.unit.is_none()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub message: String,
    pub product: ProductWithStock,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductListResponse {
    pub products: Vec<ProductWithStock>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub message: String,
    pub category: Category,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn category(name: &str, parent: Option<Uuid>) -> Category {
        Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            parent_id: parent,
            status: RecordStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_gst_rate_set() {
        assert!(is_valid_gst_rate(dec!(18)));
        assert!(is_valid_gst_rate(dec!(0.00)));
        assert!(!is_valid_gst_rate(dec!(10)));
    }

    #[test]
    fn test_build_category_tree_nests_children() {
        let food = category("Alimentos", None);
        let drinks = category("Bebidas", None);
        let rice = category("Arroz", Some(food.id));
        let orphan = category("Órfã", Some(Uuid::new_v4()));

        let tree = build_category_tree(vec![rice.clone(), drinks, food.clone(), orphan]);

        let names: Vec<&str> = tree.iter().map(|n| n.category.name.as_str()).collect();
        assert_eq!(names, vec!["Alimentos", "Bebidas", "Órfã"]);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].category.id, rice.id);
    }

    #[test]
    fn test_creates_cycle_detects_descendant() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        // a <- b <- c
        let parents = HashMap::from([(a, None), (b, Some(a)), (c, Some(b))]);

        assert!(creates_cycle(&parents, a, c));
        assert!(creates_cycle(&parents, a, a));
        assert!(!creates_cycle(&parents, c, a));
    }

    #[test]
    fn test_create_product_business_rules() {
        let payload = CreateProductPayload {
            name: "Arroz".into(),
            description: None,
            sku: "ARZ".into(),
            barcode: None,
            category_id: None,
            purchase_price: dec!(-1),
            selling_price: dec!(10),
            gst_rate: dec!(7),
            unit: None,
            initial_stock: Some(5),
            minimum_threshold: None,
            maximum_capacity: None,
        };
        assert!(payload.validate().is_ok());
        let errors = payload.validate_business_rules().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("purchase_price"));
        assert!(fields.contains_key("gst_rate"));
        assert!(!fields.contains_key("selling_price"));
    }
}
