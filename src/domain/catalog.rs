use crate::domain::product::Product;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;

/// Stateful cursor over a snapshot of products.
///
/// The sequence is copied at construction; later changes to the source
/// catalog never affect an in-flight iterator. The single position cursor
/// backs both element-wise iteration and the page accessors, so the two
/// views always agree.
pub struct CatalogIterator {
    products: Vec<Product>,
    position: usize,
}

impl CatalogIterator {
    pub fn new(products: &[Product]) -> Self {
        Self {
            products: products.to_vec(),
            position: 0,
        }
    }

    pub fn has_next(&self) -> bool {
        self.position < self.products.len()
    }

    /// Returns the next element and advances, or `None` past the end.
    pub fn next(&mut self) -> Option<Product> {
        let product = self.products.get(self.position)?.clone();
        self.position += 1;
        Some(product)
    }

    /// The element most recently returned by `next`, if any.
    pub fn current(&self) -> Option<Product> {
        if self.position == 0 {
            return None;
        }
        self.products.get(self.position - 1).cloned()
    }

    /// The element `next` would return, without advancing.
    pub fn peek(&self) -> Option<Product> {
        self.products.get(self.position).cloned()
    }

    /// Rewinds to position 0 without re-fetching the source.
    pub fn reset(&mut self) {
        self.position = 0;
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn total(&self) -> usize {
        self.products.len()
    }

    pub fn remaining(&self) -> usize {
        self.products.len() - self.position
    }

    /// Advances by `count`, clamped to the sequence length.
    pub fn skip(&mut self, count: usize) {
        self.position = (self.position + count).min(self.products.len());
    }

    pub fn to_vec(&self) -> Vec<Product> {
        self.products.clone()
    }

    /// The page containing the current cursor position.
    pub fn current_page(&self, page_size: usize) -> Vec<Product> {
        if page_size == 0 {
            return Vec::new();
        }
        let start = (self.position / page_size) * page_size;
        let end = (start + page_size).min(self.products.len());
        self.products.get(start..end).unwrap_or(&[]).to_vec()
    }

    /// Moves the cursor to the start of the given zero-based page, clamped
    /// to the sequence length.
    pub fn go_to_page(&mut self, page: usize, page_size: usize) {
        self.position = page.saturating_mul(page_size).min(self.products.len());
    }

    pub fn current_page_number(&self, page_size: usize) -> usize {
        if page_size == 0 {
            return 0;
        }
        self.position / page_size
    }

    pub fn total_pages(&self, page_size: usize) -> usize {
        if page_size == 0 {
            return 0;
        }
        self.products.len().div_ceil(page_size)
    }
}

/// Catalog-wide stock and value figures.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct CatalogStats {
    pub total: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    pub total_value: Decimal,
}

/// A materialized product sequence handing out snapshot iterators.
#[derive(Debug, Default)]
pub struct ProductCatalog {
    products: Vec<Product>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_products(&mut self, products: Vec<Product>) {
        self.products = products;
    }

    pub fn products(&self) -> Vec<Product> {
        self.products.clone()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn iterator(&self) -> CatalogIterator {
        CatalogIterator::new(&self.products)
    }

    pub fn filtered_iterator(&self, filter: impl Fn(&Product) -> bool) -> CatalogIterator {
        let filtered: Vec<Product> = self
            .products
            .iter()
            .filter(|p| filter(p))
            .cloned()
            .collect();
        CatalogIterator::new(&filtered)
    }

    pub fn sorted_iterator(
        &self,
        mut compare: impl FnMut(&Product, &Product) -> Ordering,
    ) -> CatalogIterator {
        let mut sorted = self.products.clone();
        sorted.sort_by(&mut compare);
        CatalogIterator::new(&sorted)
    }

    /// Iterator over one 1-based page of the catalog.
    pub fn paginated_iterator(&self, page: usize, page_size: usize) -> CatalogIterator {
        if page == 0 || page_size == 0 {
            return CatalogIterator::new(&[]);
        }
        let start = (page - 1) * page_size;
        let end = (start + page_size).min(self.products.len());
        CatalogIterator::new(self.products.get(start..end).unwrap_or(&[]))
    }

    /// Case-insensitive match against name and category.
    pub fn search(&self, query: &str) -> CatalogIterator {
        let needle = query.to_lowercase();
        self.filtered_iterator(|p| {
            p.name.to_lowercase().contains(&needle) || p.category.to_lowercase().contains(&needle)
        })
    }

    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> =
            self.products.iter().map(|p| p.category.clone()).collect();
        categories.sort();
        categories.dedup();
        categories
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            total: self.products.len(),
            low_stock: self
                .products
                .iter()
                .filter(|p| p.stock <= p.min_stock && p.stock > 0)
                .count(),
            out_of_stock: self.products.iter().filter(|p| p.stock == 0).count(),
            total_value: self
                .products
                .iter()
                .map(|p| p.price * Decimal::from(p.stock))
                .sum(),
        }
    }
}
