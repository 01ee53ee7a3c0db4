//! System prompt templates and per-product queries.
//!
//! The profitability arithmetic lives only in these instructions; the model
//! performs it and the crate never parses the numbers it reports.

/// System prompt for the profit calculator.
pub const PROFIT_CALCULATOR_PROMPT: &str = r#"You are a product profit calculator assistant that helps e-commerce sellers validate product profitability.

When analyzing a product:
1. Search for the product on Amazon to find retail prices.
2. Search for the product on AliExpress to find supplier/wholesale prices.
3. Calculate the profit margin with this formula:
   - Profit = Amazon Price - AliExpress Price - (Amazon Price × 0.30 for fees)
   - Margin % = (Profit / Amazon Price) × 100
4. Give a verdict:
   - ✅ PROFITABLE: Margin > 30%
   - ⚠️ MARGINAL: Margin 15-30%
   - ❌ NOT PROFITABLE: Margin < 15%
5. Save the analysis to a markdown file in the outputs folder.

Always extract actual prices from search results. If you can't find exact prices, estimate from similar products and say so in the analysis.

Format the final report as a clean markdown table with all metrics."#;

/// Shorter profit prompt used by the interactive command line.
pub const INTERACTIVE_PROFIT_PROMPT: &str = r#"You are a product profit calculator assistant for e-commerce sellers.

When analyzing a product:
1. Search for the product on Amazon to find retail prices.
2. Search for the product on AliExpress to find supplier prices.
3. Calculate the profit margin:
   - Profit = Amazon Price - AliExpress Price - (Amazon Price × 0.30)
   - Margin % = (Profit / Amazon Price) × 100
4. Verdict:
   - ✅ PROFITABLE: Margin > 30%
   - ⚠️ MARGINAL: Margin 15-30%
   - ❌ NOT PROFITABLE: Margin < 15%
5. Save the analysis to a markdown file in the outputs folder.

Always report actual prices from search results. Format as a clean markdown table."#;

/// System prompt for the description generator.
pub const DESCRIPTION_GENERATOR_PROMPT: &str = r#"You are an expert product description writer who creates SEO-optimized, compelling product descriptions for e-commerce platforms.

When given a product:
1. Use web search to research the product thoroughly:
   - Key features and specifications
   - Benefits and use cases
   - Target audience
   - Competitor descriptions on Amazon/AliExpress
   - Customer pain points it solves

2. Write THREE versions of the description:

   **SHORT VERSION (50-75 words):**
   - For product listings and a quick overview
   - Focus on 3-5 key features
   - Include the main benefit
   - End with a subtle call-to-action

   **MEDIUM VERSION (150-200 words):**
   - For the main product page
   - Detailed features in paragraph form
   - Emotional benefits
   - Why this product stands out
   - Strong call-to-action

   **LONG VERSION (300-400 words):**
   - Comprehensive, SEO-optimized description
   - Multiple paragraphs covering all aspects
   - Storytelling elements
   - Answers to customer objections
   - Natural keyword integration
   - Detailed specifications
   - Multiple calls-to-action

3. Format requirements:
   - Persuasive, engaging tone
   - Power words and emotional triggers
   - Bullet points for key features
   - Scannable and easy to read
   - SEO-optimized naturally, without forced keywords

4. Save all three versions to a markdown file in the outputs folder with clear section headers.

Make the descriptions compelling enough that customers want to buy immediately!"#;

/// Which report a task writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Analysis,
    Descriptions,
}

impl ReportKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            ReportKind::Analysis => "_analysis.md",
            ReportKind::Descriptions => "_descriptions.md",
        }
    }
}

/// Report file name for a product: spaces become underscores, lowercased.
pub fn report_file_name(product: &str, kind: ReportKind) -> String {
    format!("{}{}", product.replace(' ', "_").to_lowercase(), kind.suffix())
}

/// Query for the profit calculator.
pub fn profit_query(product: &str) -> String {
    let file_name = report_file_name(product, ReportKind::Analysis);
    format!(
        r#"Analyze the product: "{product}"

Steps to follow:
1. Search for "{product} Amazon price" to find Amazon retail prices
2. Search for "{product} AliExpress supplier price" to find wholesale prices
3. Calculate the profit margin (remember to subtract 30% fees from the Amazon price)
4. Create a detailed markdown analysis report
5. Save the report to a file named "{file_name}"

Provide your complete analysis with a clear PROFITABLE/NOT PROFITABLE verdict."#
    )
}

/// Terser profit query used by the interactive command line.
pub fn interactive_profit_query(product: &str) -> String {
    let file_name = report_file_name(product, ReportKind::Analysis);
    format!(
        r#"Analyze: "{product}"

1. Search for "{product} Amazon price"
2. Search for "{product} AliExpress price"
3. Calculate profit (subtract 30% fees)
4. Save report to "{file_name}"

Give a clear verdict: PROFITABLE or NOT PROFITABLE with reasoning."#
    )
}

/// Query for the description generator. A blank URL is ignored.
pub fn description_query(product: &str, product_url: Option<&str>) -> String {
    let file_name = report_file_name(product, ReportKind::Descriptions);
    let url_context = product_url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(|u| format!("\nProduct URL: {}", u))
        .unwrap_or_default();

    format!(
        r#"Generate compelling product descriptions for: "{product}"{url_context}

Steps to follow:
1. Search for "{product} features specifications benefits"
2. Search for "{product} Amazon product description"
3. Research the target audience and their needs
4. Generate THREE versions of descriptions:
   - SHORT (50-75 words) - for listings
   - MEDIUM (150-200 words) - for product pages
   - LONG (300-400 words) - SEO-optimized detailed description
5. Include relevant bullet points for key features
6. Save all versions to a file named "{file_name}"

Make the descriptions persuasive, benefit-focused, and ready to copy-paste!"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_lowercase_and_underscored() {
        assert_eq!(
            report_file_name("Sunset Lamp Projector", ReportKind::Analysis),
            "sunset_lamp_projector_analysis.md"
        );
        assert_eq!(
            report_file_name("Wireless Bluetooth Earbuds", ReportKind::Descriptions),
            "wireless_bluetooth_earbuds_descriptions.md"
        );
    }

    #[test]
    fn file_name_only_replaces_spaces() {
        assert_eq!(
            report_file_name("USB-C  Hub", ReportKind::Analysis),
            "usb-c__hub_analysis.md"
        );
    }

    #[test]
    fn profit_query_names_product_and_file() {
        let q = profit_query("Sunset Lamp");
        assert!(q.contains(r#"Analyze the product: "Sunset Lamp""#));
        assert!(q.contains("Sunset Lamp Amazon price"));
        assert!(q.contains("Sunset Lamp AliExpress supplier price"));
        assert!(q.contains("sunset_lamp_analysis.md"));
    }

    #[test]
    fn interactive_query_is_terse() {
        let q = interactive_profit_query("desk fan");
        assert!(q.starts_with(r#"Analyze: "desk fan""#));
        assert!(q.contains("desk_fan_analysis.md"));
        assert!(q.len() < profit_query("desk fan").len());
    }

    #[test]
    fn description_query_includes_url_only_when_given() {
        let with_url = description_query("Earbuds", Some("https://amazon.com/dp/B000"));
        assert!(with_url.contains("\nProduct URL: https://amazon.com/dp/B000"));
        assert!(with_url.contains("earbuds_descriptions.md"));

        let blank = description_query("Earbuds", Some("   "));
        let none = description_query("Earbuds", None);
        assert!(!blank.contains("Product URL"));
        assert_eq!(blank, none);
    }

    #[test]
    fn queries_for_different_products_are_independent() {
        let a = profit_query("kettle");
        let b = profit_query("toaster");
        assert!(!a.contains("toaster"));
        assert!(!b.contains("kettle"));
        assert_ne!(a, b);
    }

    #[test]
    fn prompts_state_the_margin_thresholds() {
        for prompt in [PROFIT_CALCULATOR_PROMPT, INTERACTIVE_PROFIT_PROMPT] {
            assert!(prompt.contains("Amazon Price × 0.30"));
            assert!(prompt.contains("Margin > 30%"));
            assert!(prompt.contains("Margin 15-30%"));
            assert!(prompt.contains("Margin < 15%"));
        }
    }
}
