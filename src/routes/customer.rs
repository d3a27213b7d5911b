use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::{
    directory::CustomerDirectory,
    models::{CustomerId, CustomerPatch, CustomerResponse, NewCustomer},
    DirectoryError,
};

#[derive(Debug, Serialize)]
pub struct UpdatedCustomer {
    pub id: CustomerId,
}

#[tracing::instrument(skip(directory))]
pub async fn find_by_id(
    directory: web::Data<CustomerDirectory>,
    id: web::Path<String>,
) -> Result<HttpResponse, DirectoryError> {
    let customer = directory.find_by_id(&id).await?;
    Ok(HttpResponse::Ok().json(CustomerResponse::from(customer)))
}

#[tracing::instrument(skip(directory, body))]
pub async fn create(
    directory: web::Data<CustomerDirectory>,
    body: web::Json<NewCustomer>,
) -> Result<HttpResponse, DirectoryError> {
    let customer = directory.create(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(CustomerResponse::from(customer)))
}

#[tracing::instrument(skip(directory, body))]
pub async fn update_by_email(
    directory: web::Data<CustomerDirectory>,
    email: web::Path<String>,
    body: web::Json<CustomerPatch>,
) -> Result<HttpResponse, DirectoryError> {
    let id = directory
        .update_by_email(&email, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(UpdatedCustomer { id }))
}

#[tracing::instrument(skip(directory))]
pub async fn delete_by_id(
    directory: web::Data<CustomerDirectory>,
    id: web::Path<String>,
) -> Result<HttpResponse, DirectoryError> {
    directory.delete_by_id(&id).await?;
    Ok(HttpResponse::Ok().finish())
}
