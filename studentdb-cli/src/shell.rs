// Interactive menu loop

use std::io::{BufRead, Write};
use std::ops::ControlFlow;
use studentdb::{validation, Registry, RegistryConfig, Result, Student};

pub const EMPTY_REGISTRY: &str = "You currently have no entries in your database. \
Please use 2 (add a new student) in the options menu to create an entry.";

const MENU: &str = "Options:
1 > Print all student data
2 > Add a new student
3 > Remove a student
4 > Find a student
5 > End the program";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuChoice {
    List,
    Add,
    Remove,
    Find,
    Quit,
}

impl MenuChoice {
    fn parse(input: &str) -> Option<Self> {
        match validation::strip_whitespace(input).as_str() {
            "1" => Some(MenuChoice::List),
            "2" => Some(MenuChoice::Add),
            "3" => Some(MenuChoice::Remove),
            "4" => Some(MenuChoice::Find),
            "5" => Some(MenuChoice::Quit),
            _ => None,
        }
    }
}

pub fn describe(student: &Student) -> String {
    format!(
        "Name: {} {}\nAge: {}\nID: {}",
        student.first_name, student.last_name, student.age, student.id
    )
}

/// Run the menu until the user quits or input ends.
///
/// Only failing to create or load the registry, or failing to write to
/// `out`, ends the loop with an error. Everything else is reported and the
/// menu is shown again.
pub fn run<R: BufRead, W: Write>(
    config: RegistryConfig,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "Student Registry System")?;

    let existed = config.path.exists();
    if !existed {
        writeln!(out, "Database does not exist. Creating new database...")?;
    }
    let mut registry = Registry::initialize(config)?;
    if existed {
        writeln!(out, "{} students exist.\n", registry.count())?;
    } else {
        writeln!(out, "Database created successfully!\n")?;
    }
    for warning in registry.warnings() {
        writeln!(out, "warning: {warning}")?;
    }

    loop {
        writeln!(out, "{MENU}")?;
        let choice = prompt(input, out, "What do you want to do? Input 1, 2, 3, 4, or 5: ")?;
        let Some(line) = choice else {
            break;
        };

        let flow = match MenuChoice::parse(&line) {
            Some(MenuChoice::List) => list(&registry, out)?,
            Some(MenuChoice::Add) => add(&mut registry, input, out)?,
            Some(MenuChoice::Remove) => remove(&mut registry, out)?,
            Some(MenuChoice::Find) => find(&registry, input, out)?,
            Some(MenuChoice::Quit) => ControlFlow::Break(()),
            None => {
                writeln!(out, "\nInvalid input, please input 1, 2, 3, 4 or 5.\n")?;
                ControlFlow::Continue(())
            }
        };
        if flow.is_break() {
            break;
        }
    }

    writeln!(out, "Exiting program...")?;
    Ok(())
}

/// Print `message` and read one line. `None` means input has ended.
fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    message: &str,
) -> Result<Option<String>> {
    write!(out, "{message}")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

fn list<W: Write>(registry: &Registry, out: &mut W) -> Result<ControlFlow<()>> {
    if registry.is_empty() {
        writeln!(out, "\n{EMPTY_REGISTRY}\n")?;
    } else {
        writeln!(out)?;
        for student in registry.list_all() {
            writeln!(out, "{}", student.to_line())?;
        }
        writeln!(out)?;
    }
    Ok(ControlFlow::Continue(()))
}

fn add<R: BufRead, W: Write>(
    registry: &mut Registry,
    input: &mut R,
    out: &mut W,
) -> Result<ControlFlow<()>> {
    let Some(first_name) = prompt(input, out, "Enter student first name: ")? else {
        return Ok(ControlFlow::Break(()));
    };
    let Some(last_name) = prompt(input, out, "Enter student last name: ")? else {
        return Ok(ControlFlow::Break(()));
    };
    let Some(age) = prompt(input, out, "Enter student age: ")? else {
        return Ok(ControlFlow::Break(()));
    };
    writeln!(out)?;

    let added = validation::normalize_name("first name", &first_name).and_then(|first_name| {
        let last_name = validation::normalize_name("last name", &last_name)?;
        let age = validation::parse_age(&age)?;
        registry.append(&first_name, &last_name, age)
    });

    match added {
        Ok(student) => writeln!(out, "New student created!\n{}\n", describe(&student))?,
        Err(e) => writeln!(out, "{e}\n")?,
    }
    Ok(ControlFlow::Continue(()))
}

// Records are never deleted; this only brings the stored count back in line
fn remove<W: Write>(registry: &mut Registry, out: &mut W) -> Result<ControlFlow<()>> {
    match registry.resync_counter() {
        Ok(count) => writeln!(out, "\nStudent count resynced to {count}.\n")?,
        Err(e) => writeln!(out, "\n{e}\n")?,
    }
    Ok(ControlFlow::Continue(()))
}

fn find<R: BufRead, W: Write>(
    registry: &Registry,
    input: &mut R,
    out: &mut W,
) -> Result<ControlFlow<()>> {
    let Some(id) = prompt(input, out, "Student ID: ")? else {
        return Ok(ControlFlow::Break(()));
    };

    match validation::parse_id(&id) {
        Ok(id) => match registry.find(id) {
            Some(student) => writeln!(out, "\n{}\n", describe(student))?,
            None => writeln!(out, "\nStudent not found.\n")?,
        },
        Err(e) => writeln!(out, "\n{e}\n")?,
    }
    Ok(ControlFlow::Continue(()))
}
