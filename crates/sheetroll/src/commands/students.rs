//! List the roster and suggest ids.

use anyhow::{Context as _, Result};
use clap::Args;
use console::style;
use sheetroll_core::{StudentRecord, format_phone_number};

use super::{OutputFormat, print_json, truncate};
use crate::context::Context;

#[derive(Debug, Args)]
pub struct StudentsArgs {
    /// Only students of this school
    #[arg(long)]
    pub school: Option<String>,

    /// Only students of this class
    #[arg(long)]
    pub class: Option<String>,

    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

impl StudentsArgs {
    fn keeps(&self, student: &StudentRecord) -> bool {
        self.school.as_deref().is_none_or(|s| student.school == s)
            && self.class.as_deref().is_none_or(|c| student.class == c)
    }
}

pub async fn run(ctx: &Context, args: &StudentsArgs) -> Result<()> {
    let students: Vec<StudentRecord> = ctx
        .service
        .get_student_data(&ctx.sheet, &ctx.data_range)
        .await
        .context("failed to load students")?
        .into_iter()
        .filter(|student| args.keeps(student))
        .collect();

    if args.format == OutputFormat::Json {
        return print_json(&students);
    }

    if students.is_empty() {
        println!("{}", style("No students match").dim());
        return Ok(());
    }

    println!(
        "{}",
        style(format!(
            "{:<8} {:<24} {:<10} {:<24} {}",
            "ID", "NAME", "CLASS", "SCHOOL", "MOBILE"
        ))
        .bold()
    );
    for student in &students {
        let mobile = student
            .mobile_number
            .as_deref()
            .map(format_phone_number)
            .unwrap_or_default();
        println!(
            "{:<8} {:<24} {:<10} {:<24} {}",
            style(&student.id).cyan(),
            truncate(&student.name, 24),
            truncate(&student.class, 10),
            truncate(&student.school, 24),
            mobile
        );
    }
    println!("\n{} students", students.len());
    Ok(())
}

pub async fn next_id(ctx: &Context) {
    println!("{}", ctx.service.next_student_id(&ctx.sheet).await);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(school: &str, class: &str) -> StudentRecord {
        StudentRecord {
            id: "1".to_string(),
            name: "Asha".to_string(),
            class: class.to_string(),
            school: school.to_string(),
            mobile_number: None,
        }
    }

    #[test]
    fn test_keeps_everything_without_filters() {
        let args = StudentsArgs {
            school: None,
            class: None,
            format: OutputFormat::Table,
        };
        assert!(args.keeps(&student("North", "6th")));
    }

    #[test]
    fn test_keeps_requires_every_given_filter() {
        let args = StudentsArgs {
            school: Some("North".to_string()),
            class: Some("7th".to_string()),
            format: OutputFormat::Table,
        };
        assert!(args.keeps(&student("North", "7th")));
        assert!(!args.keeps(&student("North", "6th")));
        assert!(!args.keeps(&student("South", "7th")));
    }
}
