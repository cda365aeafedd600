use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue;

use crate::model::{NewPerson, Person};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "people")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub surname: String,
    pub age: i32,
    #[sea_orm(unique)]
    pub email: String,
    pub telephone: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Person {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            surname: model.surname,
            age: model.age,
            email: model.email,
            telephone: model.telephone,
        }
    }
}

impl From<&NewPerson> for ActiveModel {
    fn from(person: &NewPerson) -> Self {
        Self {
            id: ActiveValue::NotSet,
            name: ActiveValue::Set(person.name.clone()),
            surname: ActiveValue::Set(person.surname.clone()),
            age: ActiveValue::Set(person.age),
            email: ActiveValue::Set(person.email.clone()),
            telephone: ActiveValue::Set(person.telephone.clone()),
        }
    }
}
