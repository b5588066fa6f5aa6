use actix_web::HttpResponse;
use diesel::prelude::*;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::db;
use crate::models::{Category, Subcategory};
use crate::schema::{categories, subcategories};

#[derive(Serialize)]
pub struct CategoryNode {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub subcategories: Vec<Subcategory>,
}

/// Two-level category tree, public.
pub async fn get_categories() -> HttpResponse {
    let mut conn = match db::establish_connection() {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Database connection failed"}));
        }
    };

    let cats = match categories::table
        .order(categories::name.asc())
        .load::<Category>(&mut conn)
    {
        Ok(cats) => cats,
        Err(e) => {
            error!("Failed to fetch categories: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to fetch categories"}));
        }
    };

    let subs = match subcategories::table
        .order(subcategories::name.asc())
        .load::<Subcategory>(&mut conn)
    {
        Ok(subs) => subs,
        Err(e) => {
            error!("Failed to fetch subcategories: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to fetch categories"}));
        }
    };

    let tree: Vec<CategoryNode> = cats
        .into_iter()
        .map(|cat| {
            let children = subs
                .iter()
                .filter(|s| s.category_id == cat.id)
                .map(|s| Subcategory {
                    id: s.id,
                    category_id: s.category_id,
                    name: s.name.clone(),
                    slug: s.slug.clone(),
                })
                .collect();
            CategoryNode {
                id: cat.id,
                name: cat.name,
                slug: cat.slug,
                subcategories: children,
            }
        })
        .collect();

    HttpResponse::Ok().json(tree)
}
