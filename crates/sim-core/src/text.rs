//! Token substitution for event, choice and oracle text.

/// Values available to a template. Unset values leave their token untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TemplateParams {
    pub good: Option<String>,
    pub market: Option<String>,
    pub percent: Option<i64>,
    pub quantity: Option<i64>,
    /// Money amount, rendered with thousands separators.
    pub amount: Option<i64>,
    pub direction: Option<String>,
    /// Secondary money amount (fees, costs).
    pub cost: Option<i64>,
}

impl TemplateParams {
    fn lookup(&self, token: &str) -> Option<String> {
        match token {
            "good" => self.good.clone(),
            "market" => self.market.clone(),
            "percent" => self.percent.map(|p| p.to_string()),
            "quantity" => self.quantity.map(|q| q.to_string()),
            "amount" => self.amount.map(format_money),
            "direction" => self.direction.clone(),
            "cost" => self.cost.map(format_money),
            _ => None,
        }
    }
}

/// Replace `{token}` occurrences in `template` with values from `params`.
///
/// Unknown tokens, unset parameters and unbalanced braces are copied verbatim.
pub fn render(template: &str, params: &TemplateParams) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let Some(close) = tail.find('}') else {
            out.push_str(tail);
            return out;
        };
        match params.lookup(&tail[1..close]) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&tail[..=close]),
        }
        rest = &tail[close + 1..];
    }
    out.push_str(rest);
    out
}

/// Format an integer amount with comma thousands separators, e.g. `-12,345`.
pub fn format_money(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_known_tokens() {
        let params = TemplateParams {
            good: Some("H100".into()),
            percent: Some(25),
            amount: Some(1_500),
            ..Default::default()
        };
        assert_eq!(
            render("{good} down {percent}%, lost ${amount}", &params),
            "H100 down 25%, lost $1,500"
        );
    }

    #[test]
    fn leaves_unknown_and_unset_tokens() {
        let params = TemplateParams {
            good: Some("Datasets".into()),
            ..Default::default()
        };
        assert_eq!(
            render("{good} in {market} {weird}", &params),
            "Datasets in {market} {weird}"
        );
    }

    #[test]
    fn unbalanced_brace_is_copied() {
        let params = TemplateParams::default();
        assert_eq!(render("oops {good", &params), "oops {good");
        assert_eq!(render("no tokens", &params), "no tokens");
    }

    #[test]
    fn money_grouping() {
        assert_eq!(format_money(0), "0");
        assert_eq!(format_money(999), "999");
        assert_eq!(format_money(1_000), "1,000");
        assert_eq!(format_money(1_234_567), "1,234,567");
        assert_eq!(format_money(-50_000), "-50,000");
    }
}
