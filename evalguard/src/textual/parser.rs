use winnow::{
    Result as WResult,
    ascii::{digit1, multispace0, newline, space0, space1},
    combinator::{alt, delimited, eof, opt, preceded, separated},
    prelude::*,
};

use super::{RawRecording, Target, Value};
use crate::SENTINEL;

pub(super) fn parse_recording(i: &mut &str) -> WResult<RawRecording> {
    multispace0.parse_next(i)?;
    block_header.parse_next(i)?;
    let num_residuals = residuals_line.parse_next(i)?;
    let parameter_block_sizes = opt(parameters_line).parse_next(i)?.unwrap_or_default();
    multispace0.parse_next(i)?;
    evaluation_header.parse_next(i)?;
    let assignments: Vec<_> =
        separated(0.., assignment, (newline, multispace0)).parse_next(i)?;
    multispace0.parse_next(i)?;
    eof.parse_next(i)?;
    Ok(RawRecording {
        num_residuals,
        parameter_block_sizes,
        assignments,
    })
}

fn block_header(i: &mut &str) -> WResult<()> {
    ('#', ws, "block", ws, newline).map(|_| ()).parse_next(i)
}

fn evaluation_header(i: &mut &str) -> WResult<()> {
    ('#', ws, "evaluation", ws, newline)
        .map(|_| ())
        .parse_next(i)
}

// residuals 2
fn residuals_line(i: &mut &str) -> WResult<usize> {
    (ws, "residuals", space1, count, ws, newline)
        .map(|(_, _, _, n, _, _)| n)
        .parse_next(i)
}

// parameters 3, 1
// parameters none
fn parameters_line(i: &mut &str) -> WResult<Vec<usize>> {
    (
        ws,
        "parameters",
        space1,
        alt(("none".map(|_| Vec::new()), sizes)),
        ws,
        newline,
    )
        .map(|(_, _, _, sizes, _, _)| sizes)
        .parse_next(i)
}

fn sizes(i: &mut &str) -> WResult<Vec<usize>> {
    separated(1.., count, (space0, ',', space0)).parse_next(i)
}

// j0 = [0.1, unset]
fn assignment(i: &mut &str) -> WResult<(Target, Value)> {
    ignore_ws(i);
    let target = Target::parse(i)?;
    delimited(space0, '=', space0).parse_next(i)?;
    let value = Value::parse(i)?;
    ignore_ws(i);
    Ok((target, value))
}

impl Target {
    fn parse(i: &mut &str) -> WResult<Self> {
        alt((
            "cost".map(|_| Self::Cost),
            "residuals".map(|_| Self::Residuals),
            preceded('p', count).map(Self::Parameter),
            preceded('j', count).map(Self::Jacobian),
        ))
        .parse_next(i)
    }
}

impl Value {
    fn parse(i: &mut &str) -> WResult<Self> {
        alt((
            "constant".map(|_| Self::Constant),
            array.map(Self::Array),
            parse_number.map(Self::Scalar),
        ))
        .parse_next(i)
    }
}

fn array(i: &mut &str) -> WResult<Vec<f64>> {
    delimited(
        ('[', space0),
        separated(0.., parse_number, (space0, ',', space0)),
        (space0, ']'),
    )
    .parse_next(i)
}

fn count(i: &mut &str) -> WResult<usize> {
    digit1
        .verify_map(|s: &str| s.parse::<usize>().ok())
        .parse_next(i)
}

fn parse_number(i: &mut &str) -> WResult<f64> {
    fn special(i: &mut &str) -> WResult<f64> {
        alt((
            "unset".map(|_| SENTINEL),
            "nan".map(|_| f64::NAN),
            "-inf".map(|_| f64::NEG_INFINITY),
            "inf".map(|_| f64::INFINITY),
        ))
        .parse_next(i)
    }

    fn myint(input: &mut &str) -> WResult<f64> {
        digit1
            .verify_map(|s: &str| s.parse::<f64>().ok())
            .parse_next(input)
    }

    fn myfloat(i: &mut &str) -> WResult<f64> {
        winnow::ascii::float.parse_next(i)
    }
    alt((special, myfloat, myint)).parse_next(i)
}

fn ws(i: &mut &str) -> WResult<()> {
    space0.parse_next(i).map(|_| ())
}

fn ignore_ws(i: &mut &str) {
    let _ = ws.parse_next(i);
}
