use super::{ProdStorage, UserStorage};
use crate::error::GenericError;
use crate::model::{NewUser, User, user};
use async_trait::async_trait;
use common::api::ModelId;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, QueryFilter, Set};

#[async_trait]
impl UserStorage for ProdStorage {
    async fn insert_user(&self, new_user: NewUser) -> Result<User, GenericError> {
        let model = user::ActiveModel {
            id: NotSet,
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            is_admin: Set(new_user.is_admin),
            is_verified: Set(false),
            created_at: Set(chrono::Utc::now().naive_utc()),
        };
        Ok(model.insert(&self.db).await?)
    }

    async fn find_user(&self, user_id: ModelId) -> Result<Option<User>, GenericError> {
        Ok(user::Entity::find_by_id(user_id).one(&self.db).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, GenericError> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }

    async fn mark_verified(&self, user_id: ModelId) -> Result<bool, GenericError> {
        let result = user::Entity::update_many()
            .col_expr(user::Column::IsVerified, Expr::value(true))
            .filter(user::Column::Id.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
