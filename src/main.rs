// Copyright 2021 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use bench_report::Tool;

fn main() {
    std::process::exit(bench_report::run(Tool::Rtt));
}
