use std::{
    error::Error,
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
};

fn run() -> Result<(), Box<dyn Error>> {
    let mut input = String::new();
    let mut output = String::new();
    let mut plain_io = false;
    let mut compact = false;
    {
        let mut parser = argparse::ArgumentParser::new();
        parser.set_description("Convert a Yosys JSON netlist into a schemview display netlist.");
        parser.refer(&mut plain_io).add_option(
            &["-p", "--plain-io"],
            argparse::StoreTrue,
            "Keep plain Input/Output devices instead of clickable controls",
        );
        parser.refer(&mut compact).add_option(&["-c", "--compact"], argparse::StoreTrue, "Emit compact JSON");
        parser.refer(&mut input).required().add_argument("INPUT", argparse::Store, "Input file, or - for stdin");
        parser.refer(&mut output).add_argument("OUTPUT", argparse::Store, "Output file; stdout if omitted");
        parser.parse_args_or_exit();
    }

    let mut circuit = {
        let reader: Box<dyn Read> = if input == "-" {
            Box::new(std::io::stdin().lock())
        } else {
            Box::new(File::open(&input)?)
        };
        schemview_yosys_json::import(BufReader::new(reader))?
    };

    if !plain_io {
        schemview_netlist::promote_io_devices(&mut circuit);
    }

    let writer: Box<dyn Write> = if output.is_empty() {
        Box::new(std::io::stdout().lock())
    } else {
        Box::new(File::create(&output)?)
    };
    let mut writer = BufWriter::new(writer);
    if compact {
        serde_json::to_writer(&mut writer, &circuit)?;
    } else {
        serde_json::to_writer_pretty(&mut writer, &circuit)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(error) = run() {
        eprintln!("error: {}", error);
        std::process::exit(1)
    }
}
