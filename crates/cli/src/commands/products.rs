//! Product listing command.

use std::fmt::Write as _;
use std::path::Path;

use cartwheel_cart::{BackendClient, CartConfig, ProductSource, StaticCatalog};
use cartwheel_core::{Price, ProductFilters, ProductPage};
use tracing::info;

/// List products from a catalog file or the backend.
///
/// # Errors
///
/// Returns an error if the catalog cannot be read, no backend is configured
/// when one is needed, or the listing fails.
#[allow(clippy::print_stdout)]
pub async fn list(
    config: &CartConfig,
    filters: &ProductFilters,
    catalog: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let page = match catalog {
        Some(path) => {
            let json = tokio::fs::read_to_string(path).await?;
            let catalog = StaticCatalog::from_json(&json)?;
            catalog.list_products(filters).await?
        }
        None => {
            let client = BackendClient::new(config.require_backend()?);
            client.list_products(filters).await?
        }
    };

    info!(
        count = page.products.len(),
        total = page.total,
        "Listed products"
    );
    print!("{}", render(&page));
    Ok(())
}

/// Format a page of products as a plain-text table.
pub fn render(page: &ProductPage) -> String {
    if page.products.is_empty() {
        return "No products found\n".to_string();
    }

    let mut out = String::new();
    for product in &page.products {
        let _ = writeln!(
            out,
            "{:<12} {:<30} {:<12} {:>10}",
            product.id.as_str(),
            product.name,
            product.sku,
            Price::from_amount(product.price).display(),
        );
    }
    if u64::try_from(page.products.len()).is_ok_and(|shown| shown < page.total) {
        let _ = writeln!(
            out,
            "Page {} ({} of {} products)",
            page.page,
            page.products.len(),
            page.total
        );
    }
    out
}
