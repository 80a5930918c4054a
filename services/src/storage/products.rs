use super::{ProdStorage, ProductStorage};
use crate::error::GenericError;
use crate::model::{Product, product};
use async_trait::async_trait;
use common::api::{ModelId, ProductCreate, ProductUpdate};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, NotSet, QueryFilter, QueryOrder,
    Set,
};

#[async_trait]
impl ProductStorage for ProdStorage {
    async fn list_products(&self, published_only: bool) -> Result<Vec<Product>, GenericError> {
        let mut query = product::Entity::find();
        if published_only {
            query = query.filter(product::Column::Published.eq(true));
        }
        Ok(query
            .order_by_desc(product::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn get_product(&self, product_id: ModelId) -> Result<Option<Product>, GenericError> {
        Ok(product::Entity::find_by_id(product_id).one(&self.db).await?)
    }

    async fn create_product(&self, input: ProductCreate) -> Result<Product, GenericError> {
        let model = product::ActiveModel {
            id: NotSet,
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            published: Set(input.published),
            image_url: Set(input.image_url),
            created_at: Set(chrono::Utc::now().naive_utc()),
        };
        Ok(model.insert(&self.db).await?)
    }

    async fn update_product(
        &self,
        product_id: ModelId,
        update: ProductUpdate,
    ) -> Result<Option<Product>, GenericError> {
        let Some(existing) = product::Entity::find_by_id(product_id).one(&self.db).await? else {
            return Ok(None);
        };

        let mut model = existing.into_active_model();
        if let Some(name) = update.name {
            model.name = Set(name);
        }
        if let Some(description) = update.description {
            model.description = Set(description);
        }
        if let Some(price) = update.price {
            model.price = Set(price);
        }
        if let Some(published) = update.published {
            model.published = Set(published);
        }
        if let Some(image_url) = update.image_url {
            model.image_url = Set(Some(image_url));
        }

        Ok(Some(model.update(&self.db).await?))
    }

    async fn delete_product(&self, product_id: ModelId) -> Result<bool, GenericError> {
        let result = product::Entity::delete_by_id(product_id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}
