use crate::models::SalaryType;

/// Display form of an expected salary. Total packages are stored as a number
/// of ten-thousands and shown with a "w" suffix; monthly salaries are stored
/// pre-formatted as "<monthly>k×<months>" and shown as-is.
pub fn format_salary(salary_type: Option<SalaryType>, value: Option<&str>) -> String {
    let (Some(salary_type), Some(value)) = (salary_type, value) else {
        return "-".to_string();
    };
    match salary_type {
        SalaryType::TotalPackage => format!("{value}w"),
        SalaryType::Monthly => value.to_string(),
        SalaryType::Negotiable => "Negotiable".to_string(),
    }
}

/// Annualized package in ten-thousands, for minimum-salary filtering.
///
/// Total packages contribute their leading number directly; monthly values
/// are parsed from the "<monthly>k×<months>" encoding and annualized as
/// monthly × months / 12. Negotiable and unparsable values return None and
/// therefore never satisfy a minimum-salary filter.
pub fn annualized_salary(salary_type: SalaryType, value: &str) -> Option<f64> {
    match salary_type {
        SalaryType::TotalPackage => {
            let re = regex::Regex::new(r"(\d+(?:\.\d+)?)").ok()?;
            let cap = re.captures(value)?;
            cap[1].parse::<f64>().ok()
        }
        SalaryType::Monthly => {
            let re = regex::Regex::new(r"(\d+(?:\.\d+)?)k×(\d+)").ok()?;
            let cap = re.captures(value)?;
            let monthly: f64 = cap[1].parse().ok()?;
            let months: f64 = cap[2].parse().ok()?;
            Some(monthly * months / 12.0)
        }
        SalaryType::Negotiable => None,
    }
}
