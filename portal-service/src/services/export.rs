//! CSV rendering of the admin student listing.

use crate::dtos::StudentSummary;

const STUDENT_COLUMNS: [&str; 11] = [
    "First Name",
    "Last Name",
    "Email",
    "Phone",
    "Street Address",
    "City",
    "State/Province",
    "Postal Code",
    "Country",
    "Enrollments",
    "Joined Date",
];

/// One header row plus one row per student. Every cell is quoted.
pub fn students_csv(students: &[StudentSummary]) -> String {
    let mut out = String::new();
    push_row(&mut out, STUDENT_COLUMNS.iter().copied());

    for student in students {
        let address = student.address.clone().unwrap_or_default();
        let enrollments = student.enrollment_count.to_string();
        let joined = student.created_utc.format("%Y-%m-%d").to_string();

        push_row(
            &mut out,
            [
                student.first_name.as_str(),
                student.last_name.as_str(),
                student.email.as_str(),
                student.phone.as_str(),
                address.street.as_str(),
                address.city.as_str(),
                address.state.as_str(),
                address.postal_code.as_str(),
                address.country.as_str(),
                enrollments.as_str(),
                joined.as_str(),
            ],
        );
    }

    out
}

fn push_row<'a>(out: &mut String, cells: impl IntoIterator<Item = &'a str>) {
    for (i, cell) in cells.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('"');
        out.push_str(&cell.replace('"', "\"\""));
        out.push('"');
    }
    out.push('\n');
}
