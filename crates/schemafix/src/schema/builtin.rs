//! Built-in canonical schema for order/customer records.

use super::column::CanonicalColumn;
use super::registry::SchemaRegistry;
use super::types::{CasePolicy, ExpectedFormat};
use crate::error::Result;

/// GSTIN: state code, PAN, entity number, `Z`, checksum.
const TAX_ID_PATTERN: &str = r"^\d{2}[A-Z]{5}\d{4}[A-Z][A-Z\d]Z[A-Z\d]$";

/// Column definitions of the built-in schema.
pub fn default_columns() -> Vec<CanonicalColumn> {
    use ExpectedFormat::*;

    vec![
        CanonicalColumn::new("order_id", IdentifierPattern)
            .with_description("Unique order identifier")
            .with_example("ORD-1001")
            .with_pattern(r"^ORD-\d+$")
            .with_case(CasePolicy::Upper)
            .with_synonyms(&["order number", "order_no", "order ref", "po number"])
            .required(),
        CanonicalColumn::new("order_date", Date)
            .with_description("Date the order was placed")
            .with_example("2024-03-14")
            .with_synonyms(&["date", "purchase date", "order dt"])
            .required(),
        CanonicalColumn::new("customer_id", IdentifierPattern)
            .with_description("Unique customer identifier")
            .with_example("CUST-0042")
            .with_pattern(r"^CUST-\d+$")
            .with_case(CasePolicy::Upper)
            .with_synonyms(&["cust_id", "client_id", "customer_number", "client_number"])
            .required(),
        CanonicalColumn::new("customer_name", FreeText)
            .with_description("Full customer name")
            .with_example("Asha Rao")
            .with_case(CasePolicy::Title)
            .with_synonyms(&["full_name", "client_name", "buyer name"]),
        CanonicalColumn::new("email", Email)
            .with_description("Primary email address")
            .with_example("asha.rao@example.com")
            .with_synonyms(&["email address", "email_addr", "e_mail", "mail"]),
        CanonicalColumn::new("phone", Phone)
            .with_description("Contact phone number")
            .with_example("+91-9876543210")
            .with_synonyms(&["phone number", "contact_phone", "telephone", "tel", "mobile"]),
        CanonicalColumn::new("billing_address", FreeText)
            .with_description("Billing street address")
            .with_example("12 MG Road")
            .with_synonyms(&["bill address", "billing addr", "street address", "address"]),
        CanonicalColumn::new("shipping_address", FreeText)
            .with_description("Delivery street address")
            .with_example("12 MG Road")
            .with_synonyms(&["ship address", "delivery address", "shipping addr"]),
        CanonicalColumn::new("city", FreeText)
            .with_description("City")
            .with_example("Bengaluru")
            .with_case(CasePolicy::Title)
            .with_synonyms(&["town", "municipality"]),
        CanonicalColumn::new("state", FreeText)
            .with_description("State or province")
            .with_example("Karnataka")
            .with_case(CasePolicy::Title)
            .with_synonyms(&["province", "region", "state code"]),
        CanonicalColumn::new("postal_code", IdentifierPattern)
            .with_description("Six digit PIN code")
            .with_example("560001")
            .with_pattern(r"^\d{6}$")
            .with_synonyms(&["zip", "zip code", "postcode", "pin", "pincode"]),
        CanonicalColumn::new("country", Categorical)
            .with_description("Country name")
            .with_example("India")
            .with_case(CasePolicy::Title)
            .with_synonyms(&["country_name", "nation"]),
        CanonicalColumn::new("product_sku", IdentifierPattern)
            .with_description("Stock keeping unit")
            .with_example("SKU-2001")
            .with_pattern(r"^[A-Z0-9][A-Z0-9-]*$")
            .with_case(CasePolicy::Upper)
            .with_synonyms(&["sku", "item code", "product code"]),
        CanonicalColumn::new("product_name", FreeText)
            .with_description("Product display name")
            .with_example("Steel Water Bottle")
            .with_synonyms(&["item", "item name", "product"]),
        CanonicalColumn::new("category", FreeText)
            .with_description("Product category")
            .with_example("Kitchen")
            .with_case(CasePolicy::Title)
            .with_synonyms(&["product category", "segment"]),
        CanonicalColumn::new("quantity", Numeric)
            .with_description("Units ordered")
            .with_example("2")
            .with_range(Some(1.0), None)
            .with_synonyms(&["qty", "units", "count"]),
        CanonicalColumn::new("unit_price", Currency)
            .with_description("Price per unit")
            .with_example("499.00")
            .with_synonyms(&["price", "rate", "unit cost"]),
        CanonicalColumn::new("currency", Categorical)
            .with_description("ISO currency code")
            .with_example("INR")
            .with_case(CasePolicy::Upper)
            .with_allowed_values(&["INR", "USD", "EUR", "GBP"])
            .with_synonyms(&["currency code", "curr"]),
        CanonicalColumn::new("discount_pct", Percentage)
            .with_description("Discount as a fraction")
            .with_example("0.1")
            .with_synonyms(&["discount", "discount percent", "disc"]),
        CanonicalColumn::new("tax_pct", Percentage)
            .with_description("Tax rate as a fraction")
            .with_example("0.18")
            .with_synonyms(&["tax rate", "gst rate", "tax percent"]),
        CanonicalColumn::new("shipping_fee", Currency)
            .with_description("Shipping charge")
            .with_example("50.00")
            .with_synonyms(&["shipping", "delivery charge", "shipping cost"]),
        CanonicalColumn::new("total_amount", Currency)
            .with_description("Order total including tax")
            .with_example("1047.82")
            .with_synonyms(&["total", "amount", "order total", "grand total"]),
        CanonicalColumn::new("tax_id", IdentifierPattern)
            .with_description("GSTIN of the buyer")
            .with_example("29ABCDE1234F1Z5")
            .with_pattern(TAX_ID_PATTERN)
            .with_case(CasePolicy::Upper)
            .with_synonyms(&["gstin", "vat_number", "tax_number"]),
    ]
}

impl SchemaRegistry {
    /// Registry over the built-in order/customer schema.
    pub fn builtin() -> Result<Self> {
        Self::new(default_columns())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_valid() {
        let registry = SchemaRegistry::builtin().unwrap();
        assert_eq!(registry.len(), 23);
        assert_eq!(
            registry.required_columns().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["order_id", "order_date", "customer_id"]
        );
    }

    #[test]
    fn test_builtin_tax_id_pattern() {
        let registry = SchemaRegistry::builtin().unwrap();
        let pattern = registry.pattern("tax_id").unwrap();
        assert!(pattern.is_match("29ABCDE1234F1Z5"));
        assert!(!pattern.is_match("29-1234567"));
    }

    #[test]
    fn test_builtin_synonyms_resolve() {
        let registry = SchemaRegistry::builtin().unwrap();
        assert_eq!(registry.resolve_exact("Email Addr").unwrap().name, "email");
        assert_eq!(registry.resolve_exact("ZIP").unwrap().name, "postal_code");
        assert_eq!(registry.resolve_exact("Cust ID").unwrap().name, "customer_id");
    }
}
